//! Streaming downloads with progress, verification, cancellation and retry

mod config;
mod core;
mod retry;
mod stream;
mod validation;

pub use config::{DownloadConfig, DownloadRequest, DownloadResult, RetryConfig};
pub use core::{Downloader, ResourceProvider};
pub use stream::DownloadStream;
pub use validation::{validate_url, Source};
