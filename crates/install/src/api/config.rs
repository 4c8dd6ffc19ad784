use ifw_config::constants::{BACKUP_DIR, COMPONENTS_FILE, JOURNAL_FILE, RESOURCE_SCHEME};
use ifw_config::{Config, FetchPolicy};
use ifw_platform::UserDirs;
use std::path::{Path, PathBuf};

/// Installer configuration
#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Installation directory, the value of `@TargetDir@`
    pub target_dir: PathBuf,
    /// Parent of the per-run download directory
    pub temp_dir: PathBuf,
    pub application_name: String,
    pub application_version: String,
    /// Where the maintenance tool is written
    pub maintenance_tool: PathBuf,
    /// Executable the maintenance tool is built from; without one the
    /// performed operations are written as a plain data file
    pub stub: Option<PathBuf>,
    /// Repository base URLs
    pub sources: Vec<String>,
    pub fetch_policy: FetchPolicy,
    /// Installer binary carrying its own repository
    pub embedded: Option<PathBuf>,
    /// Override home, config and data directories
    pub user_dirs: Option<UserDirs>,
    /// Override the system configuration root
    pub system_dir: Option<PathBuf>,
}

impl InstallConfig {
    #[must_use]
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        let target_dir = target_dir.into();
        Self {
            maintenance_tool: target_dir.join(ifw_config::constants::DEFAULT_MAINTENANCE_TOOL),
            target_dir,
            temp_dir: std::env::temp_dir(),
            application_name: "ifw".to_string(),
            application_version: String::new(),
            stub: None,
            sources: Vec::new(),
            fetch_policy: FetchPolicy::default(),
            embedded: None,
            user_dirs: None,
            system_dir: None,
        }
    }

    /// Settings for installing into `target_dir` (or the configured one)
    #[must_use]
    pub fn from_config(config: &Config, target_dir: Option<PathBuf>) -> Self {
        let target_dir = target_dir.unwrap_or_else(|| config.target_dir());
        Self {
            maintenance_tool: config.maintenance_tool_path(&target_dir),
            temp_dir: config.temp_dir(),
            application_name: config.installer.application_name.clone(),
            application_version: config.installer.application_version.clone(),
            sources: config.metadata.enabled_sources(),
            fetch_policy: config.metadata.fetch_policy,
            ..Self::new(target_dir)
        }
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    #[must_use]
    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_stub(mut self, stub: impl Into<PathBuf>) -> Self {
        self.stub = Some(stub.into());
        self
    }

    #[must_use]
    pub fn with_embedded(mut self, installer: impl Into<PathBuf>) -> Self {
        self.embedded = Some(installer.into());
        self
    }

    #[must_use]
    pub fn with_application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.application_name = name.into();
        self.application_version = version.into();
        self
    }

    #[must_use]
    pub fn with_user_dirs(mut self, dirs: UserDirs) -> Self {
        self.user_dirs = Some(dirs);
        self
    }

    #[must_use]
    pub fn with_system_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system_dir = Some(dir.into());
        self
    }

    /// Every repository to read metadata from, the embedded one first
    #[must_use]
    pub fn repositories(&self) -> Vec<String> {
        let mut repositories = Vec::with_capacity(self.sources.len() + 1);
        if self.embedded.is_some() {
            repositories.push(RESOURCE_SCHEME.to_string());
        }
        repositories.extend(self.sources.iter().cloned());
        repositories
    }

    #[must_use]
    pub fn components_file(&self) -> PathBuf {
        self.target_dir.join(COMPONENTS_FILE)
    }

    #[must_use]
    pub fn journal_file(&self) -> PathBuf {
        self.target_dir.join(JOURNAL_FILE)
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.target_dir.join(BACKUP_DIR)
    }

    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}
