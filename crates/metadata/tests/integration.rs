//! Integration tests for metadata

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ifw_metadata::*;
    use ifw_types::{Component, Version};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_installed_state_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("components.xml");
        assert!(PackagesInfo::load(&path).await.unwrap().is_none());

        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let component = Component::new("app.core", Version::parse("2.0").unwrap(), date);
        let mut state = PackagesInfo::new("Demo", "2.0");
        state.install_package(PackageInfo::from_component(&component, date));
        state.save(&path).await.unwrap();

        let loaded = PackagesInfo::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.contains("app.core"));
    }

    #[tokio::test]
    async fn test_corrupt_state_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("components.xml");
        tokio::fs::write(&path, "<Packages><Package>").await.unwrap();
        assert!(PackagesInfo::load(&path).await.is_err());
    }

    #[test]
    fn test_repository_generated_updates_parse() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let mut core = Component::new("app.core", Version::parse("1.0").unwrap(), date);
        core.auto_depend_on = vec!["app.runtime".to_string()];
        let mut info = UpdatesInfo::new("Demo", "1.0");
        info.packages.push(core);

        let parsed = UpdatesInfo::parse(&info.to_xml(), "Updates.xml").unwrap();
        assert_eq!(parsed.packages[0].auto_depend_on, vec!["app.runtime"]);
        assert!(parsed.packages[0].checkable);
    }
}
