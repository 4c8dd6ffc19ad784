//! Integration tests for ops crate

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ifw_config::Config;
    use ifw_events::{AppEvent, GeneralEvent};
    use ifw_metadata::UpdatesInfo;
    use ifw_ops::*;
    use ifw_types::{Component, OperationDescriptor, RunStatus, Version};
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        repo: PathBuf,
        target: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempdir().unwrap();
            let root = temp.path().to_path_buf();
            let repo = root.join("repo");
            std::fs::create_dir_all(&repo).unwrap();
            std::fs::write(root.join("stub"), b"#!/bin/sh\nexit 0\n").unwrap();
            Self {
                repo,
                target: root.join("target"),
                root,
                _temp: temp,
            }
        }

        fn publish(&self) {
            let date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
            let mut runtime = Component::new("app.runtime", Version::parse("1.0").unwrap(), date);
            runtime.operations.push(OperationDescriptor::new(
                "Mkdir",
                ["@TargetDir@/lib"],
            ));
            let mut core = Component::new("app.core", Version::parse("1.0").unwrap(), date);
            core.dependencies
                .push(ifw_types::Dependency::parse("app.runtime").unwrap());
            core.operations
                .push(OperationDescriptor::new("Mkdir", ["@TargetDir@/bin"]));

            let mut updates = UpdatesInfo::new("Demo", "1.0");
            updates.packages = vec![runtime, core];
            std::fs::write(self.repo.join("Updates.xml"), updates.to_xml()).unwrap();
        }

        fn context(&self, sources: Vec<String>) -> (OpsCtx, ifw_events::EventReceiver) {
            let (tx, rx) = ifw_events::channel();
            let mut config = Config::default();
            config.paths.temp_dir = Some(self.root.join("tmp"));
            let ctx = OpsContextBuilder::new()
                .with_config(config)
                .with_event_sender(tx)
                .with_target_dir(self.target.clone())
                .with_sources(sources)
                .with_stub(self.root.join("stub"))
                .build()
                .unwrap();
            (ctx, rx)
        }

        fn repo_source(&self) -> Vec<String> {
            vec![self.repo.display().to_string()]
        }
    }

    #[tokio::test]
    async fn test_install_list_inspect_uninstall() {
        let fixture = Fixture::new();
        fixture.publish();
        let (ctx, _rx) = fixture.context(fixture.repo_source());

        let report = install(&ctx, &["app.core".to_string()]).await.unwrap();
        assert_eq!(report.status, RunStatus::Finished);
        assert!(fixture.target.join("bin").is_dir());
        assert!(fixture.target.join("lib").is_dir());

        let listing = list_components(&ctx, false).await.unwrap();
        let rows: Vec<(&str, ComponentStatus)> = listing
            .iter()
            .map(|row| (row.name.as_str(), row.status))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("app.core", ComponentStatus::Installed),
                ("app.runtime", ComponentStatus::Installed),
            ]
        );

        let tool = ctx.installer.config().maintenance_tool.clone();
        let inspected = inspect(&tool).await.unwrap();
        assert_eq!(inspected.marker, "package manager");
        assert_eq!(inspected.stub_len, 17);
        assert_eq!(inspected.operations.len(), 2);

        let result = OperationResult::Run(
            uninstall(&ctx, &[]).await.unwrap(),
        );
        assert!(result.is_success());
        if let OperationResult::Run(report) = &result {
            assert_eq!(report.removed.len(), 2);
        }
        assert!(!fixture.target.join("bin").exists());
        assert!(!tool.exists());
    }

    #[tokio::test]
    async fn test_list_degrades_when_repository_is_missing() {
        let fixture = Fixture::new();
        let missing = fixture.root.join("nowhere").display().to_string();
        let (ctx, mut rx) = fixture.context(vec![missing]);

        let listing = list_components(&ctx, false).await.unwrap();
        assert!(listing.is_empty());

        let mut warned = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, AppEvent::General(GeneralEvent::Warning { .. })) {
                warned = true;
            }
        }
        assert!(warned);
    }

    #[tokio::test]
    async fn test_failed_run_is_not_success() {
        let fixture = Fixture::new();
        fixture.publish();
        let (ctx, _rx) = fixture.context(fixture.repo_source());

        let report = install(&ctx, &["app.missing".to_string()]).await.unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(!OperationResult::Run(report).is_success());
    }

    #[tokio::test]
    async fn test_result_json_shape() {
        let result = OperationResult::Recovery(RecoveryInfo::default());
        let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "Recovery");
        assert_eq!(value["data"]["recovered"], false);
    }
}
