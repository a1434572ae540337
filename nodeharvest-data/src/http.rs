//! Shared HTTP client construction and error mapping.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default user agent for every outbound request.
pub const DEFAULT_USER_AGENT: &str = "nodeharvest/0.1";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client settings shared by feature sources and geocoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Per-request timeout in seconds, also used as the connect timeout.
    pub timeout_secs: u64,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpClientConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build a [`Client`] honouring these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the TLS backend cannot initialise.
    pub fn build_client(&self) -> Result<Client, ClientBuildError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.timeout())
            .timeout(self.timeout())
            .build()
            .map_err(ClientBuildError)
    }
}

/// Failure to construct the HTTP client.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[source] pub reqwest::Error);

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
    },
    /// The request did not complete within the timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
        /// Timeout that elapsed.
        timeout_secs: u64,
    },
    /// The connection failed or the body could not be read.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// Error reported by the transport.
        message: String,
    },
}

/// Map a `reqwest` error onto [`TransportError`].
pub(crate) fn convert_reqwest_error(
    error: &reqwest::Error,
    url: &str,
    timeout_secs: u64,
) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout {
            url: url.to_owned(),
            timeout_secs,
        };
    }

    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    TransportError::Network {
        url: url.to_owned(),
        message: error.to_string(),
    }
}

/// Issue a GET request and return the response body as text.
pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    timeout_secs: u64,
) -> Result<String, TransportError> {
    send_text(client.get(url).query(query), url, timeout_secs).await
}

/// Send a prepared request and return the response body as text.
pub(crate) async fn send_text(
    request: RequestBuilder,
    url: &str,
    timeout_secs: u64,
) -> Result<String, TransportError> {
    let response = request
        .send()
        .await
        .map_err(|err| convert_reqwest_error(&err, url, timeout_secs))?
        .error_for_status()
        .map_err(|err| convert_reqwest_error(&err, url, timeout_secs))?;
    response
        .text()
        .await
        .map_err(|err| convert_reqwest_error(&err, url, timeout_secs))
}
