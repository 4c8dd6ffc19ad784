#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for ifw
//!
//! Configuration is merged from, in increasing precedence:
//! - Default values (hard-coded)
//! - Configuration file (`~/.config/ifw/config.toml`)
//! - Environment variables (`IFW_*`)
//! - CLI flags

pub mod constants;
pub mod resources_semaphore;

pub use resources_semaphore::{
    acquire_semaphore_permit, create_semaphore, try_acquire_semaphore_permit,
};

use ifw_errors::{ConfigError, Error};
use ifw_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub installer: InstallerConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub default_output: OutputFormat,
    #[serde(default)]
    pub color: ColorChoice,
    #[serde(default = "default_parallel_downloads")]
    pub parallel_downloads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::default(),
            color: ColorChoice::default(),
            parallel_downloads: default_parallel_downloads(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Total request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Maximum silence between two body chunks, in seconds
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout: u64,
    /// Retries for transient failures
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            chunk_timeout: default_chunk_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            proxy: None,
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    #[must_use]
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// How metadata fetch failures of individual sources are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Skip failing sources; fail only when no source answered
    #[default]
    Any,
    /// Any failing source fails the run
    All,
}

impl FromStr for FetchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(ConfigError::InvalidValue {
                field: "fetch_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "any",
            Self::All => "all",
        })
    }
}

/// A repository that publishes `Updates.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Metadata fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataConfig {
    #[serde(default)]
    pub fetch_policy: FetchPolicy,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl MetadataConfig {
    /// URLs of the enabled sources in declaration order
    #[must_use]
    pub fn enabled_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.url.clone())
            .collect()
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub target_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Installer identity and behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default = "default_application_version")]
    pub application_version: String,
    #[serde(default = "default_maintenance_tool_name")]
    pub maintenance_tool_name: String,
    /// Whether operations may request elevated rights
    #[serde(default)]
    pub allow_elevation: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            application_version: default_application_version(),
            maintenance_tool_name: default_maintenance_tool_name(),
            allow_elevation: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_parallel_downloads() -> usize {
    4
}

fn default_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_chunk_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_progress_interval_ms() -> u64 {
    100
}

fn default_user_agent() -> String {
    format!("ifw/{}", env!("CARGO_PKG_VERSION"))
}

fn default_application_name() -> String {
    "ifw".to_string()
}

fn default_application_version() -> String {
    "1.0.0".to_string()
}

fn default_maintenance_tool_name() -> String {
    constants::DEFAULT_MAINTENANCE_TOOL.to_string()
}

fn parse_bool(field: &str, value: String) -> Result<bool, ConfigError> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }),
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("ifw").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or parsed.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            tracing::debug!(path = %config_path.display(), "loading configuration");
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: &Option<PathBuf>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Save configuration to a path
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an `IFW_*` variable holds a value that cannot be
    /// parsed into the expected type.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(output) = std::env::var("IFW_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "IFW_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        if let Ok(color) = std::env::var("IFW_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "IFW_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Ok(downloads) = std::env::var("IFW_PARALLEL_DOWNLOADS") {
            self.general.parallel_downloads =
                downloads.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "IFW_PARALLEL_DOWNLOADS".to_string(),
                    value: downloads,
                })?;
        }

        if let Ok(retries) = std::env::var("IFW_NETWORK_RETRIES") {
            self.network.retries = retries.parse().map_err(|_| ConfigError::InvalidValue {
                field: "IFW_NETWORK_RETRIES".to_string(),
                value: retries,
            })?;
        }

        if let Ok(proxy) = std::env::var("IFW_PROXY") {
            self.network.proxy = (!proxy.is_empty()).then_some(proxy);
        }

        if let Ok(policy) = std::env::var("IFW_FETCH_POLICY") {
            self.metadata.fetch_policy = policy.parse().map_err(|_| {
                ConfigError::InvalidValue {
                    field: "IFW_FETCH_POLICY".to_string(),
                    value: policy,
                }
            })?;
        }

        if let Ok(target) = std::env::var("IFW_TARGET_DIR") {
            self.paths.target_dir = Some(PathBuf::from(target));
        }

        if let Ok(elevation) = std::env::var("IFW_ALLOW_ELEVATION") {
            self.installer.allow_elevation = parse_bool("IFW_ALLOW_ELEVATION", elevation)?;
        }

        Ok(())
    }

    /// Installation directory (with default)
    #[must_use]
    pub fn target_dir(&self) -> PathBuf {
        self.paths.target_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(&self.installer.application_name)
        })
    }

    /// Scratch space for downloads and extraction
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.paths
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Directory for debug log files
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("ifw")
                .join("logs")
        })
    }

    /// Path of the maintenance tool inside `target_dir`
    #[must_use]
    pub fn maintenance_tool_path(&self, target_dir: &Path) -> PathBuf {
        target_dir.join(&self.installer.maintenance_tool_name)
    }
}
