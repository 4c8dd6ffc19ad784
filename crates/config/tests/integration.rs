//! Integration tests for config

#[cfg(test)]
mod tests {
    use ifw_config::*;
    use ifw_types::{ColorChoice, OutputFormat};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Env var tests must not interleave
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            "IFW_OUTPUT",
            "IFW_COLOR",
            "IFW_PARALLEL_DOWNLOADS",
            "IFW_NETWORK_RETRIES",
            "IFW_PROXY",
            "IFW_FETCH_POLICY",
            "IFW_TARGET_DIR",
            "IFW_ALLOW_ELEVATION",
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"
parallel_downloads = 8
color = "never"

[network]
retries = 2
proxy = "http://proxy.local:3128"

[metadata]
fetch_policy = "all"

[[metadata.sources]]
url = "https://repo.example.com/linux"

[[metadata.sources]]
url = "https://mirror.example.com/linux"
enabled = false

[installer]
application_name = "Demo"
maintenance_tool_name = "DemoMaintenance"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert_eq!(config.general.parallel_downloads, 8);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.network.retries, 2);
        assert_eq!(config.network.connect_timeout, 30);
        assert_eq!(config.metadata.fetch_policy, FetchPolicy::All);
        assert_eq!(
            config.metadata.enabled_sources(),
            vec!["https://repo.example.com/linux".to_string()]
        );
        assert_eq!(config.installer.maintenance_tool_name, "DemoMaintenance");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.retries, 1);
        assert_eq!(config.metadata.fetch_policy, FetchPolicy::Any);
        assert_eq!(config.network.progress_interval().as_millis(), 100);
        assert_eq!(
            config.maintenance_tool_path(std::path::Path::new("/opt/demo")),
            std::path::PathBuf::from("/opt/demo/maintenancetool")
        );
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("IFW_OUTPUT", "json");
        std::env::set_var("IFW_COLOR", "always");
        std::env::set_var("IFW_FETCH_POLICY", "all");
        std::env::set_var("IFW_TARGET_DIR", "/opt/demo");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.metadata.fetch_policy, FetchPolicy::All);
        assert_eq!(config.target_dir(), std::path::PathBuf::from("/opt/demo"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("IFW_PARALLEL_DOWNLOADS", "many");
        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
        std::env::set_var("IFW_ALLOW_ELEVATION", "perhaps");
        assert!(config.merge_env().is_err());

        clear_env();
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(&dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.general.parallel_downloads = 2;
        config.save_to(&path).await.unwrap();

        let reloaded = Config::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.general.parallel_downloads, 2);
    }
}
