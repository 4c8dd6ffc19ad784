//! URL validation and transport selection

use ifw_config::constants::RESOURCE_SCHEME;
use ifw_errors::{Error, NetworkError};
use std::path::PathBuf;
use url::Url;

/// Where a download reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// `file://` URL or a plain path
    File(PathBuf),
    /// `resource:<name>` served from inside the running binary
    Resource(String),
    Http(Url),
}

/// Validate a URL and pick its transport
///
/// # Errors
///
/// `InvalidUrl` for malformed input and `UnsupportedScheme` for anything
/// other than http, https, file, resource or a plain path.
pub fn validate_url(url: &str) -> Result<Source, Error> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(NetworkError::InvalidUrl("empty URL".to_string()).into());
    }
    if let Some(name) = trimmed.strip_prefix(RESOURCE_SCHEME) {
        let name = name.trim_start_matches('/');
        if name.is_empty() {
            return Err(NetworkError::InvalidUrl(url.to_string()).into());
        }
        return Ok(Source::Resource(name.to_string()));
    }

    match Url::parse(trimmed) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(Source::Http(parsed)),
            "file" => parsed
                .to_file_path()
                .map(Source::File)
                .map_err(|()| NetworkError::InvalidUrl(url.to_string()).into()),
            // A Windows drive letter parses as a one-letter scheme
            scheme if scheme.len() == 1 => Ok(Source::File(PathBuf::from(trimmed))),
            scheme => Err(NetworkError::UnsupportedScheme {
                scheme: scheme.to_string(),
            }
            .into()),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Source::File(PathBuf::from(trimmed))),
        Err(e) => Err(NetworkError::InvalidUrl(format!("{url}: {e}")).into()),
    }
}
