//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use ifw_archive::{create_archive, Compression};
    use ifw_errors::{Error, Stage};
    use ifw_events::{AppEvent, LifecycleEvent, OperationEvent};
    use ifw_install::*;
    use ifw_metadata::{PackagesInfo, UpdatesInfo};
    use ifw_net::Downloader;
    use ifw_operations::{
        ComponentScript, CustomOperation, OperationRegistry, RunContext, ScriptHost, ScriptRegistry,
    };
    use ifw_platform::UserDirs;
    use ifw_types::{
        ArchiveRef, Component, OperationDescriptor, RunMode, RunStatus, Version,
    };
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    const ARCHIVE: &str = "content.tar.zst";

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
            Self {
                repo,
                target: root.join("target"),
                root,
                _temp: temp,
            }
        }

        fn config(&self) -> InstallConfig {
            InstallConfig::new(&self.target)
                .with_sources(vec![self.repo.display().to_string()])
                .with_temp_dir(self.root.join("tmp"))
                .with_user_dirs(UserDirs::rooted_at(&self.root.join("home")))
                .with_system_dir(self.root.join("system"))
        }

        fn installer(&self) -> Installer {
            Installer::new(self.config(), Downloader::with_defaults().unwrap()).unwrap()
        }

        fn publish(&self, packages: Vec<Component>) {
            let mut updates = UpdatesInfo::new("Demo", "1.0");
            updates.packages = packages;
            std::fs::write(self.repo.join("Updates.xml"), updates.to_xml()).unwrap();
        }

        /// Pack `files` as the archive of `component` at `version`
        async fn pack(&self, component: &str, version: &str, files: &[(&str, &str)]) {
            let source = self.root.join("pack").join(component).join(version);
            for (path, contents) in files {
                let path = source.join(path);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, contents).unwrap();
            }
            let dir = self.repo.join(component);
            std::fs::create_dir_all(&dir).unwrap();
            create_archive(&source, &dir.join(format!("{version}{ARCHIVE}")), Compression::Zstd)
                .await
                .unwrap();
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.target.join(relative)
        }
    }

    fn component(name: &str, version: &str) -> Component {
        Component::new(
            name,
            Version::parse(version).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
    }

    fn op(name: &str, args: &[&str]) -> OperationDescriptor {
        OperationDescriptor::new(name, args.iter().copied())
    }

    fn runtime(version: &str) -> Component {
        let mut runtime = component("app.runtime", version);
        runtime.archives.push(ArchiveRef::new(ARCHIVE));
        runtime.operations.push(op("Mkdir", &["@TargetDir@/share"]));
        runtime
    }

    fn core(operations: Vec<OperationDescriptor>) -> Component {
        let mut core = component("app.core", "1.0");
        core.auto_depend_on.push("app.runtime".to_string());
        core.operations = operations;
        core
    }

    async fn published_pair(fixture: &Fixture, core_operations: Vec<OperationDescriptor>) {
        fixture
            .pack("app.runtime", "1.0", &[("lib/runtime.txt", "runtime 1.0")])
            .await;
        fixture.publish(vec![runtime("1.0"), core(core_operations)]);
    }

    fn drain(rx: &mut ifw_events::EventReceiver) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn undone(events: &[AppEvent]) -> Vec<(Option<String>, String)> {
        events
            .iter()
            .filter_map(|event| match event {
                AppEvent::Operation(OperationEvent::Undone {
                    component,
                    operation,
                }) => Some((component.clone(), operation.clone())),
                _ => None,
            })
            .collect()
    }

    fn changed(changes: &[ifw_types::ComponentChange]) -> Vec<&str> {
        changes.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_install_pulls_auto_dependency_first() {
        let fixture = Fixture::new();
        published_pair(
            &fixture,
            vec![
                op("Mkdir", &["@TargetDir@/bin"]),
                op("AppendFile", &["@TargetDir@/bin/app.conf", "name=@ApplicationName@"]),
            ],
        )
        .await;

        let report = fixture
            .installer()
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);
        assert_eq!(report.mode, RunMode::Install);
        assert_eq!(changed(&report.installed), vec!["app.runtime", "app.core"]);
        assert_eq!(report.operations, 4);
        assert_eq!(
            std::fs::read_to_string(fixture.path("lib/runtime.txt")).unwrap(),
            "runtime 1.0"
        );
        assert_eq!(
            std::fs::read_to_string(fixture.path("bin/app.conf")).unwrap(),
            "name=ifw"
        );

        let state = PackagesInfo::load(&fixture.path("components.xml"))
            .await
            .unwrap()
            .unwrap();
        assert!(state.contains("app.runtime"));
        assert!(state.contains("app.core"));

        let tool = MaintenanceTool::open(&fixture.path("maintenancetool"))
            .await
            .unwrap();
        assert_eq!(tool.operations().len(), 4);
        assert!(!fixture.path("installer.journal.json").exists());
        assert!(!fixture.path(".ifw-backup").exists());
    }

    #[tokio::test]
    async fn test_failing_operation_unwinds_whole_run() {
        let fixture = Fixture::new();
        published_pair(
            &fixture,
            vec![
                op("Mkdir", &["@TargetDir@/bin"]),
                op("Mkdir", &["@TargetDir@/etc"]),
                op("Copy", &["@TargetDir@/missing.txt", "@TargetDir@/bin/app"]),
            ],
        )
        .await;

        let (tx, mut rx) = ifw_events::channel();
        let report = fixture
            .installer()
            .install(
                InstallContext::new()
                    .add_component("app.core")
                    .with_event_sender(tx),
            )
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        let failure = report.failure.unwrap();
        assert_eq!(failure.stage, Stage::Apply);
        assert_eq!(failure.component.as_deref(), Some("app.core"));
        assert!(failure.operation.unwrap().starts_with("Copy("));
        assert!(report.installed.is_empty());

        let order: Vec<(Option<String>, String)> = undone(&drain(&mut rx));
        let names: Vec<(&str, &str)> = order
            .iter()
            .map(|(component, op)| {
                (
                    component.as_deref().unwrap_or_default(),
                    op.split('(').next().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("app.core", "Copy"),
                ("app.core", "Mkdir"),
                ("app.core", "Mkdir"),
                ("app.runtime", "Mkdir"),
                ("app.runtime", "ExtractArchive"),
            ]
        );
        assert!(order[1].1.contains("etc"));
        assert!(order[2].1.contains("bin"));

        for leftover in ["bin", "etc", "share", "lib/runtime.txt", "components.xml", "maintenancetool"] {
            assert!(!fixture.path(leftover).exists(), "{leftover} left behind");
        }
        assert!(!fixture.path("installer.journal.json").exists());
    }

    struct CancelRun {
        token: CancellationToken,
    }

    #[async_trait]
    impl CustomOperation for CancelRun {
        async fn execute(
            &self,
            _args: &[String],
            _ctx: &mut RunContext,
        ) -> Result<serde_json::Value, Error> {
            self.token.cancel();
            Ok(serde_json::Value::Null)
        }

        async fn undo(
            &self,
            _args: &[String],
            _data: &serde_json::Value,
            _ctx: &mut RunContext,
        ) -> Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancel_finishes_current_operation_then_unwinds() {
        let fixture = Fixture::new();
        published_pair(
            &fixture,
            vec![
                op("Mkdir", &["@TargetDir@/bin"]),
                op("CancelRun", &[]),
                op("Mkdir", &["@TargetDir@/etc"]),
            ],
        )
        .await;

        let token = CancellationToken::new();
        let mut registry = OperationRegistry::new();
        registry
            .register_custom(
                "CancelRun",
                Arc::new(CancelRun {
                    token: token.clone(),
                }),
            )
            .unwrap();
        let installer = fixture.installer().with_registry(registry);

        let (tx, mut rx) = ifw_events::channel();
        let report = installer
            .install(
                InstallContext::new()
                    .add_component("app.core")
                    .with_cancel(token)
                    .with_event_sender(tx),
            )
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Canceled);
        let events = drain(&mut rx);
        let undone: Vec<String> = undone(&events).into_iter().map(|(_, op)| op).collect();
        assert_eq!(undone.first().map(String::as_str), Some("CancelRun()"));
        assert_eq!(undone.len(), 4);
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Lifecycle(LifecycleEvent::Finished {
                status: RunStatus::Canceled
            })
        )));
        assert!(!fixture.path("bin").exists());
        assert!(!fixture.path("etc").exists());
        assert!(!fixture.path("lib/runtime.txt").exists());
        assert!(!fixture.path("components.xml").exists());
    }

    #[tokio::test]
    async fn test_uninstall_cascades_and_removes_tool() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![op("Mkdir", &["@TargetDir@/bin"])]).await;
        let installer = fixture.installer();
        installer
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();
        assert!(fixture.path("bin").exists());

        let report = installer
            .uninstall(UninstallContext::new().add_component("app.runtime"))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);
        assert_eq!(changed(&report.removed), vec!["app.core", "app.runtime"]);
        for leftover in ["bin", "share", "lib/runtime.txt", "components.xml", "maintenancetool"] {
            assert!(!fixture.path(leftover).exists(), "{leftover} left behind");
        }
    }

    #[tokio::test]
    async fn test_uninstall_keeps_unrelated_components() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![op("Mkdir", &["@TargetDir@/bin"])]).await;
        let installer = fixture.installer();
        installer
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();

        let report = installer
            .uninstall(UninstallContext::new().add_component("app.core"))
            .await
            .unwrap();

        assert_eq!(changed(&report.removed), vec!["app.core"]);
        assert!(!fixture.path("bin").exists());
        assert!(fixture.path("lib/runtime.txt").exists());
        let tool = MaintenanceTool::open(&fixture.path("maintenancetool"))
            .await
            .unwrap();
        assert_eq!(
            tool.components().into_iter().collect::<Vec<_>>(),
            vec!["app.runtime".to_string()]
        );
    }

    #[tokio::test]
    async fn test_update_replaces_installed_version() {
        let fixture = Fixture::new();
        fixture
            .pack("app.runtime", "1.0", &[("lib/runtime.txt", "runtime 1.0")])
            .await;
        fixture.publish(vec![runtime("1.0")]);
        let installer = fixture.installer();
        installer
            .install(InstallContext::new().add_component("app.runtime"))
            .await
            .unwrap();

        fixture
            .pack("app.runtime", "2.0", &[("lib/runtime.txt", "runtime 2.0")])
            .await;
        fixture.publish(vec![runtime("2.0")]);
        let report = installer.update(UpdateContext::new()).await.unwrap();

        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);
        assert_eq!(changed(&report.updated), vec!["app.runtime"]);
        assert_eq!(
            report.updated[0].from_version,
            Some(Version::parse("1.0").unwrap())
        );
        assert_eq!(
            std::fs::read_to_string(fixture.path("lib/runtime.txt")).unwrap(),
            "runtime 2.0"
        );
        let state = installer.installed_components().await.unwrap().unwrap();
        assert_eq!(
            state.find("app.runtime").unwrap().version,
            Version::parse("2.0").unwrap()
        );
        let tool = MaintenanceTool::open(&fixture.path("maintenancetool"))
            .await
            .unwrap();
        assert_eq!(tool.operations().len(), 2);
    }

    #[tokio::test]
    async fn test_update_without_newer_versions_is_empty() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![]).await;
        let installer = fixture.installer();
        installer
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();

        let report = installer.update(UpdateContext::new()).await.unwrap();
        assert_eq!(report.status, RunStatus::Finished);
        assert!(report.updated.is_empty());
        assert_eq!(report.operations, 0);
    }

    #[tokio::test]
    async fn test_recover_undoes_leftover_journal() {
        let fixture = Fixture::new();
        let config = fixture.config();
        let registry = OperationRegistry::new();
        let mut ctx = RunContext::new(&fixture.target, config.backup_dir());
        let mut mkdir = registry
            .create(&op("Mkdir", &["@TargetDir@/half/done"]), Some("app.core"))
            .unwrap();
        registry.execute(&mut mkdir, &mut ctx).await.unwrap();
        assert!(fixture.path("half/done").exists());

        let mut journal = Journal::new(config.journal_file(), Uuid::new_v4(), RunMode::Install, None);
        journal.record(&mkdir).await.unwrap();
        std::fs::write(fixture.path("components.xml"), "<Packages/>").unwrap();

        let installer = fixture.installer();
        let recovered = installer.recover(None).await.unwrap().unwrap();
        assert_eq!(recovered.operations, 1);
        assert_eq!(recovered.undone, 1);
        assert!(!fixture.path("half").exists());
        assert!(!fixture.path("components.xml").exists());
        assert!(!config.journal_file().exists());

        assert!(installer.recover(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recover_puts_previous_maintenance_tool_back() {
        let fixture = Fixture::new();
        let config = fixture.config();
        std::fs::create_dir_all(&fixture.target).unwrap();
        std::fs::write(&config.maintenance_tool, "previous tool").unwrap();

        let mut journal = Journal::new(
            config.journal_file(),
            Uuid::new_v4(),
            RunMode::Update,
            Some("<Packages/>".to_string()),
        );
        journal
            .snapshot_tool(&config.maintenance_tool, &config.backup_dir())
            .await
            .unwrap();
        // Died after rewriting the tool, before commit
        std::fs::write(&config.maintenance_tool, "rewritten tool").unwrap();

        let recovered = fixture.installer().recover(None).await.unwrap().unwrap();
        assert_eq!(recovered.operations, 0);
        assert_eq!(
            std::fs::read_to_string(&config.maintenance_tool).unwrap(),
            "previous tool"
        );
        assert!(!config.backup_dir().exists());
        assert!(!config.journal_file().exists());
    }

    #[tokio::test]
    async fn test_no_reachable_source_fails_fetch() {
        let fixture = Fixture::new();
        let config = fixture.config().with_sources(vec![
            fixture.root.join("nowhere").display().to_string(),
        ]);
        let installer = Installer::new(config, Downloader::with_defaults().unwrap()).unwrap();

        let report = installer
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failure.unwrap().stage, Stage::Fetch);
    }

    #[tokio::test]
    async fn test_fetch_policy_decides_on_partial_failure() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![]).await;
        let sources = vec![
            fixture.root.join("nowhere").display().to_string(),
            fixture.repo.display().to_string(),
        ];

        let lenient = fixture.config().with_sources(sources.clone());
        let report = Installer::new(lenient, Downloader::with_defaults().unwrap())
            .unwrap()
            .install(InstallContext::new().add_component("app.runtime"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);

        let strict_target = fixture.root.join("strict");
        let strict = InstallConfig::new(&strict_target)
            .with_sources(sources)
            .with_temp_dir(fixture.root.join("tmp"))
            .with_fetch_policy(ifw_config::FetchPolicy::All);
        let report = Installer::new(strict, Downloader::with_defaults().unwrap())
            .unwrap()
            .install(InstallContext::new().add_component("app.runtime"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(!strict_target.join("lib/runtime.txt").exists());
    }

    #[tokio::test]
    async fn test_unknown_component_fails_resolution() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![]).await;
        let report = fixture
            .installer()
            .install(InstallContext::new().add_component("app.missing"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failure.unwrap().stage, Stage::Resolve);
    }

    fn write_stub(dir: &Path) -> PathBuf {
        let stub = dir.join("stub");
        std::fs::write(&stub, b"#!/bin/sh\nexit 0\n").unwrap();
        stub
    }

    #[tokio::test]
    async fn test_offline_installer_installs_without_sources() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![op("Mkdir", &["@TargetDir@/bin"])]).await;
        let stub = write_stub(&fixture.root);
        let output = fixture.root.join("offline-installer");

        let created = create_installer(&fixture.repo, &stub, &output, &[])
            .await
            .unwrap();
        assert_eq!(created.components, vec!["app.runtime", "app.core"]);
        assert_eq!(created.archives, 1);
        assert!(std::fs::read(&output).unwrap().starts_with(b"#!/bin/sh"));

        std::fs::remove_dir_all(&fixture.repo).unwrap();
        let config = fixture
            .config()
            .with_sources(Vec::new())
            .with_embedded(&output)
            .with_stub(&output);
        let report = Installer::new(config, Downloader::with_defaults().unwrap())
            .unwrap()
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);
        assert_eq!(changed(&report.installed), vec!["app.runtime", "app.core"]);
        assert!(fixture.path("lib/runtime.txt").exists());
        let tool = std::fs::read(fixture.path("maintenancetool")).unwrap();
        assert!(tool.starts_with(b"#!/bin/sh"));
    }

    #[tokio::test]
    async fn test_offline_installer_rejects_unknown_component() {
        let fixture = Fixture::new();
        published_pair(&fixture, vec![]).await;
        let stub = write_stub(&fixture.root);
        let result = create_installer(
            &fixture.repo,
            &stub,
            &fixture.root.join("out"),
            &["app.missing".to_string()],
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Install(ifw_errors::InstallError::ComponentNotFound(_)))
        ));
    }

    struct PluginScript;

    #[async_trait]
    impl ComponentScript for PluginScript {
        async fn create_operations(
            &self,
            _component: &Component,
            host: &mut dyn ScriptHost,
        ) -> Result<(), Error> {
            let name = host.read_value("ApplicationName").unwrap_or_default();
            host.register_operation(op("Mkdir", &["@TargetDir@/plugins"]))?;
            host.register_operation(op(
                "AppendFile",
                &["@TargetDir@/plugins/owner.txt", &name],
            ))
        }
    }

    #[tokio::test]
    async fn test_component_script_operations_are_recorded() {
        let fixture = Fixture::new();
        let mut core = core(vec![op("Mkdir", &["@TargetDir@/bin"])]);
        core.script = Some("plugins.qs".to_string());
        fixture
            .pack("app.runtime", "1.0", &[("lib/runtime.txt", "runtime 1.0")])
            .await;
        fixture.publish(vec![runtime("1.0"), core]);

        let mut scripts = ScriptRegistry::new();
        scripts.register("plugins.qs", Arc::new(PluginScript));
        let installer = Installer::new(
            fixture.config().with_application("Demo Suite", "3.1"),
            Downloader::with_defaults().unwrap(),
        )
        .unwrap()
        .with_scripts(scripts);

        let report = installer
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);
        assert_eq!(
            std::fs::read_to_string(fixture.path("plugins/owner.txt")).unwrap(),
            "Demo Suite"
        );

        let report = installer
            .uninstall(UninstallContext::new().add_component("app.core"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Finished, "{:?}", report.failure);
        assert!(!fixture.path("plugins").exists());
    }

    #[tokio::test]
    async fn test_missing_script_fails_before_applying() {
        let fixture = Fixture::new();
        let mut core = core(vec![]);
        core.script = Some("absent.qs".to_string());
        fixture
            .pack("app.runtime", "1.0", &[("lib/runtime.txt", "runtime 1.0")])
            .await;
        fixture.publish(vec![runtime("1.0"), core]);

        let report = fixture
            .installer()
            .install(InstallContext::new().add_component("app.core"))
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(!fixture.path("lib/runtime.txt").exists());
    }
}
