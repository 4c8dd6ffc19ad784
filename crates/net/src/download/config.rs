//! Configuration structures for downloads

use ifw_config::NetworkConfig;
use ifw_hash::Hash;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for downloads
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Read buffer for file and resource transports (default: 64KiB)
    pub buffer_size: usize,
    /// Maximum number of concurrent downloads in a batch
    pub max_concurrent: usize,
    pub retry: RetryConfig,
    /// Maximum silence between two chunks
    pub chunk_timeout: Duration,
    /// Minimum spacing of progress events
    pub progress_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self::from_network(&NetworkConfig::default(), 4)
    }
}

impl DownloadConfig {
    #[must_use]
    pub fn from_network(network: &NetworkConfig, max_concurrent: usize) -> Self {
        Self {
            buffer_size: 64 * 1024,
            max_concurrent: max_concurrent.max(1),
            retry: RetryConfig {
                max_retries: network.retries,
                initial_delay: network.retry_delay(),
                ..RetryConfig::default()
            },
            chunk_timeout: network.chunk_timeout(),
            progress_interval: network.progress_interval(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// One file to fetch
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub expected_hash: Option<Hash>,
    /// Component the payload belongs to, for events
    pub component: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            expected_hash: None,
            component: None,
        }
    }

    #[must_use]
    pub fn with_hash(mut self, hash: Hash) -> Self {
        self.expected_hash = Some(hash);
        self
    }

    #[must_use]
    pub fn for_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

/// Result of a download operation
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub hash: Hash,
    pub size: u64,
    pub elapsed: Duration,
    pub attempts: u32,
}
