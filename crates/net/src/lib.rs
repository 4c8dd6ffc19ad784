#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for ifw
//!
//! Repository metadata and payload archives are fetched through one
//! [`Downloader`] that understands `http(s)://`, `file://`, plain paths and
//! `resource:` names served from the running binary.

mod auth;
mod client;
pub mod download;

pub use auth::{CredentialProvider, Credentials, StaticCredentials};
pub use client::{NetClient, NetConfig};
pub use download::{
    validate_url, DownloadConfig, DownloadRequest, DownloadResult, DownloadStream, Downloader,
    ResourceProvider, RetryConfig, Source,
};

use ifw_errors::{Error, FormatError};
use tokio_util::sync::CancellationToken;

/// Join a repository base and a relative file name
///
/// Works for URLs and for plain directory paths alike.
#[must_use]
pub fn join_url(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if base.is_empty() {
        relative.to_string()
    } else {
        format!("{base}/{relative}")
    }
}

/// Fetch a small text document such as `Updates.xml`
///
/// # Errors
///
/// Transport errors, `Cancelled`, or `FormatError::InvalidContent` if the
/// body is not UTF-8.
pub async fn fetch_text(
    downloader: &Downloader,
    url: &str,
    cancel: &CancellationToken,
) -> Result<String, Error> {
    tracing::debug!(url, "fetching text");
    let bytes = downloader.fetch_bytes(url, cancel).await?;
    String::from_utf8(bytes).map_err(|e| {
        FormatError::InvalidContent {
            file: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://repo.example.com/linux/", "Updates.xml"),
            "https://repo.example.com/linux/Updates.xml"
        );
        assert_eq!(join_url("/srv/repo", "/app.core/1.0data.tar"), "/srv/repo/app.core/1.0data.tar");
        assert_eq!(join_url("", "Updates.xml"), "Updates.xml");
    }
}
