//! The geocoding provider seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::http::TransportError;

/// Best candidate returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    /// Longitude in WGS84 degrees.
    pub longitude: f64,
    /// Latitude in WGS84 degrees.
    pub latitude: f64,
    /// Provider confidence on a 0-100 scale.
    pub score: f64,
    /// Address as the provider understood it.
    pub address: String,
}

/// Failures raised by a geocoding provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeocodeError {
    /// The request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The body was not valid JSON for the provider.
    #[error("malformed geocoder response from {url}: {source}")]
    Malformed {
        /// Request URL.
        url: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The provider reported an error.
    #[error("geocoder at {url} reported: {message}")]
    Service {
        /// Request URL.
        url: String,
        /// Provider message.
        message: String,
    },
    /// A candidate carried unusable coordinates.
    #[error("geocoder at {url} returned an invalid candidate: {detail}")]
    InvalidCandidate {
        /// Request URL.
        url: String,
        /// What was wrong.
        detail: String,
    },
}

/// A free-text address geocoder.
#[async_trait(?Send)]
pub trait Geocoder {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Resolve `address` to at most one candidate.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeCandidate>, GeocodeError>;
}
