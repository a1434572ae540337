//! Esri World Geocoding Service client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{GeocodeCandidate, GeocodeError, Geocoder};
use crate::http::get_text;

/// Default `findAddressCandidates` endpoint.
pub const DEFAULT_ARCGIS_GEOCODER: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    candidates: Vec<ArcgisCandidate>,
    #[serde(default)]
    error: Option<ArcgisError>,
}

#[derive(Debug, Deserialize)]
struct ArcgisCandidate {
    #[serde(default)]
    address: Option<String>,
    location: Option<ArcgisLocation>,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct ArcgisLocation {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct ArcgisError {
    #[serde(default)]
    message: String,
}

/// [`Geocoder`] backed by an ArcGIS `findAddressCandidates` endpoint.
#[derive(Debug, Clone)]
pub struct ArcgisGeocoder {
    client: Client,
    endpoint: String,
    country_code: String,
    timeout_secs: u64,
}

impl ArcgisGeocoder {
    /// Build a geocoder for `endpoint` restricted to `country_code`.
    #[must_use]
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        country_code: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            country_code: country_code.into(),
            timeout_secs,
        }
    }
}

#[async_trait(?Send)]
impl Geocoder for ArcgisGeocoder {
    fn name(&self) -> &str {
        "arcgis"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        let query = [
            ("f", "json".to_owned()),
            ("singleLine", address.to_owned()),
            ("maxLocations", "1".to_owned()),
            ("countryCode", self.country_code.clone()),
            ("outSR", "4326".to_owned()),
        ];
        let body = get_text(&self.client, &self.endpoint, &query, self.timeout_secs).await?;
        let response: CandidatesResponse =
            serde_json::from_str(&body).map_err(|source| GeocodeError::Malformed {
                url: self.endpoint.clone(),
                source,
            })?;
        if let Some(error) = response.error {
            return Err(GeocodeError::Service {
                url: self.endpoint.clone(),
                message: error.message,
            });
        }
        let Some(best) = response.candidates.into_iter().next() else {
            return Ok(None);
        };
        let Some(location) = best.location else {
            return Err(GeocodeError::InvalidCandidate {
                url: self.endpoint.clone(),
                detail: "candidate has no location".to_owned(),
            });
        };
        Ok(Some(GeocodeCandidate {
            longitude: location.x,
            latitude: location.y,
            score: best.score,
            address: best.address.unwrap_or_else(|| address.to_owned()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS: &str = "Autopista 45 Y Calle 245, Bogotá, Colombia";

    fn geocoder(server: &MockServer) -> ArcgisGeocoder {
        ArcgisGeocoder::new(
            Client::new(),
            format!("{}/findAddressCandidates", server.uri()),
            "CO",
            5,
        )
    }

    #[tokio::test]
    async fn returns_the_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/findAddressCandidates"))
            .and(query_param("singleLine", ADDRESS))
            .and(query_param("countryCode", "CO"))
            .and(query_param("maxLocations", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "address": "AK 45 & CL 245, Bogotá",
                    "location": { "x": -74.04, "y": 4.76 },
                    "score": 92.5
                }]
            })))
            .mount(&server)
            .await;

        let candidate = geocoder(&server)
            .geocode(ADDRESS)
            .await
            .expect("request succeeds")
            .expect("one candidate");
        assert_eq!(candidate.longitude, -74.04);
        assert_eq!(candidate.latitude, 4.76);
        assert_eq!(candidate.score, 92.5);
        assert_eq!(candidate.address, "AK 45 & CL 245, Bogotá");
    }

    #[tokio::test]
    async fn no_candidates_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let result = geocoder(&server).geocode(ADDRESS).await.expect("request succeeds");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn error_payload_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "code": 498, "message": "Invalid Token" }
            })))
            .mount(&server)
            .await;

        let err = geocoder(&server).geocode(ADDRESS).await.expect_err("service error");
        assert!(matches!(err, GeocodeError::Service { .. }), "{err:?}");
    }
}
