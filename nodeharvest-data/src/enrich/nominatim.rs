//! OpenStreetMap Nominatim client.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use super::{GeocodeCandidate, GeocodeError, Geocoder};
use crate::http::send_text;

/// Default Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// [`Geocoder`] backed by a Nominatim `search` endpoint.
///
/// Nominatim reports no confidence, so every candidate carries the
/// configured default score.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    country_codes: String,
    user_agent: String,
    default_score: f64,
    timeout_secs: u64,
}

impl NominatimGeocoder {
    /// Build a geocoder for `endpoint`.
    #[must_use]
    pub fn new(client: Client, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            country_codes: "co".to_owned(),
            user_agent: crate::http::DEFAULT_USER_AGENT.to_owned(),
            default_score: 80.0,
            timeout_secs,
        }
    }

    /// Restrict results to the comma-separated `country_codes`.
    #[must_use]
    pub fn with_country_codes(mut self, country_codes: impl Into<String>) -> Self {
        self.country_codes = country_codes.into();
        self
    }

    /// Identify requests with `user_agent`, as the usage policy requires.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Score assigned to every candidate.
    #[must_use]
    pub const fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = score;
        self
    }

    fn coordinate(&self, text: &str, axis: &str) -> Result<f64, GeocodeError> {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| GeocodeError::InvalidCandidate {
                url: self.endpoint.clone(),
                detail: format!("{axis} {text:?} is not a number"),
            })
    }
}

#[async_trait(?Send)]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        let request = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, self.user_agent.as_str())
            .query(&[
                ("format", "json"),
                ("q", address),
                ("limit", "1"),
                ("countrycodes", self.country_codes.as_str()),
            ]);
        let body = send_text(request, &self.endpoint, self.timeout_secs).await?;
        let places: Vec<Place> =
            serde_json::from_str(&body).map_err(|source| GeocodeError::Malformed {
                url: self.endpoint.clone(),
                source,
            })?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(GeocodeCandidate {
            longitude: self.coordinate(&place.lon, "longitude")?,
            latitude: self.coordinate(&place.lat, "latitude")?,
            score: self.default_score,
            address: place.display_name.unwrap_or_else(|| address.to_owned()),
        }))
    }
}
