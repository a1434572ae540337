//! Error types produced while fetching pages.

use thiserror::Error;

use crate::http::TransportError;

/// Errors that abort a paginated fetch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The request itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The body was not valid JSON.
    #[error("malformed response from {url}: {source}")]
    Malformed {
        /// Request URL.
        url: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The service answered with an explicit error payload.
    #[error("service at {url} reported error {code}: {message}")]
    Service {
        /// Request URL.
        url: String,
        /// Error code reported by the service.
        code: i64,
        /// Error message reported by the service.
        message: String,
    },
    /// The configured endpoint is not an absolute URL.
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// URL parsing failure.
        #[source]
        source: url::ParseError,
    },
    /// The body was JSON but neither a record array nor a feature object.
    #[error("unexpected response shape from {url}")]
    UnexpectedShape {
        /// Request URL.
        url: String,
    },
}

impl FetchError {
    /// Whether the failure happened below the HTTP payload.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
