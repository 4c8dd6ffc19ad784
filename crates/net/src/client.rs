//! HTTP client with connection pooling, proxy and authentication

use crate::auth::{authorization_header, parse_challenge, CredentialProvider};
use ifw_config::NetworkConfig;
use ifw_errors::{Error, NetworkError};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for NetConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            timeout: config.timeout(),
            connect_timeout: config.connect_timeout(),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// HTTP client wrapper
///
/// Credentials are asked for per request when a server answers 401; they
/// are never cached on the client.
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl std::fmt::Debug for NetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetClient")
            .field("credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns `ProxyError` for an unusable proxy URL and `ConnectionFailed`
    /// if the underlying client cannot be built.
    pub fn new(config: &NetConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| NetworkError::ProxyError(format!("{proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            credentials: None,
        })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(&NetConfig::default())
    }

    #[must_use]
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// GET a URL, answering one authentication challenge if a credential
    /// provider is configured
    ///
    /// # Errors
    ///
    /// Transport failures, `AuthenticationRequired` for an unanswered 401
    /// and `HttpError` for any other unsuccessful status.
    pub async fn get(&self, url: &Url) -> Result<Response, Error> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, url))?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            self.retry_with_credentials(url, &response).await?
        } else {
            response
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(NetworkError::AuthenticationRequired {
                url: url.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        Ok(response)
    }

    async fn retry_with_credentials(&self, url: &Url, challenge: &Response) -> Result<Response, Error> {
        let unauthorized = || {
            Error::from(NetworkError::AuthenticationRequired {
                url: url.to_string(),
            })
        };
        let provider = self.credentials.as_ref().ok_or_else(unauthorized)?;
        let challenge = challenge
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_challenge)
            .ok_or_else(unauthorized)?;
        let credentials = provider
            .credentials(url, challenge.realm())
            .ok_or_else(unauthorized)?;

        tracing::debug!(url = %url, realm = ?challenge.realm(), "answering authentication challenge");
        let header = authorization_header(&challenge, &credentials, "GET", url);
        self.client
            .get(url.clone())
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, url))
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Convert a reqwest failure into the network error taxonomy
pub(crate) fn map_reqwest_error(err: &reqwest::Error, url: &Url) -> Error {
    if err.is_timeout() {
        return NetworkError::Timeout {
            url: url.to_string(),
        }
        .into();
    }
    if is_connection_reset(err) {
        return NetworkError::ConnectionReset {
            url: url.to_string(),
        }
        .into();
    }
    if err.is_connect() {
        return NetworkError::ConnectionFailed(format!("{url}: {err}")).into();
    }
    NetworkError::TransferFailed(format!("{url}: {err}")).into()
}

fn is_connection_reset(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
            );
        }
        source = inner.source();
    }
    false
}
