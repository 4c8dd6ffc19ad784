//! Operations context for dependency injection

use ifw_config::Config;
use ifw_errors::{ConfigError, Error};
use ifw_events::{EventEmitter, EventSender};
use ifw_install::{InstallConfig, Installer};
use ifw_net::{DownloadConfig, Downloader, NetClient, NetConfig};
use ifw_platform::{ElevationProvider, StaticElevation};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Operations context providing access to the installer and settings
pub struct OpsCtx {
    /// Installer bound to the target directory
    pub installer: Installer,
    /// Event sender for progress reporting
    pub tx: EventSender,
    /// System configuration
    pub config: Config,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl OpsCtx {
    // No public constructor - use OpsContextBuilder instead

    /// Target directory runs operate on
    #[must_use]
    pub fn target_dir(&self) -> PathBuf {
        self.installer.config().target_dir.clone()
    }
}

/// Builder for [`OpsCtx`]
pub struct OpsContextBuilder {
    config: Option<Config>,
    tx: Option<EventSender>,
    target_dir: Option<PathBuf>,
    sources: Option<Vec<String>>,
    stub: Option<PathBuf>,
    embedded: Option<PathBuf>,
    elevation: Option<Arc<dyn ElevationProvider>>,
    cancel: Option<CancellationToken>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            tx: None,
            target_dir: None,
            sources: None,
            stub: None,
            embedded: None,
            elevation: None,
            cancel: None,
        }
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Override the configured target directory
    #[must_use]
    pub fn with_target_dir(mut self, dir: PathBuf) -> Self {
        self.target_dir = Some(dir);
        self
    }

    /// Replace the configured repositories
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Executable whose bytes start a new maintenance tool
    #[must_use]
    pub fn with_stub(mut self, stub: PathBuf) -> Self {
        self.stub = Some(stub);
        self
    }

    /// Installer binary carrying an embedded repository
    #[must_use]
    pub fn with_embedded(mut self, installer: PathBuf) -> Self {
        self.embedded = Some(installer);
        self
    }

    #[must_use]
    pub fn with_elevation_provider(mut self, provider: Arc<dyn ElevationProvider>) -> Self {
        self.elevation = Some(provider);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the context
    ///
    /// Without an explicit elevation provider, elevation is granted or
    /// denied by `installer.allow_elevation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event sender is missing, the HTTP client
    /// cannot be built or the embedded repository cannot be opened.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let tx = self.tx.ok_or_else(|| ConfigError::Invalid {
            message: "operations context needs an event sender".to_string(),
        })?;
        let config = self.config.unwrap_or_default();

        let mut install_config = InstallConfig::from_config(&config, self.target_dir);
        if let Some(sources) = self.sources {
            install_config = install_config.with_sources(sources);
        }
        if let Some(stub) = self.stub {
            install_config = install_config.with_stub(stub);
        }
        if let Some(embedded) = self.embedded {
            install_config = install_config.with_embedded(embedded);
        }

        let client = NetClient::new(&NetConfig::from(&config.network))?;
        let downloader = Downloader::new(
            client,
            DownloadConfig::from_network(&config.network, config.general.parallel_downloads),
        );
        let elevation = self.elevation.unwrap_or_else(|| {
            Arc::new(StaticElevation::new(config.installer.allow_elevation))
        });
        let installer =
            Installer::new(install_config, downloader)?.with_elevation_provider(elevation);

        Ok(OpsCtx {
            installer,
            tx,
            config,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl Default for OpsContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
