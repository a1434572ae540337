//! Enrichment configuration.

use serde::{Deserialize, Serialize};

use nodeharvest_core::Origin;

use super::AddressSettings;
use super::arcgis::DEFAULT_ARCGIS_GEOCODER;
use super::nominatim::DEFAULT_NOMINATIM_ENDPOINT;

const DEFAULT_MIN_SCORE: f64 = 70.0;

/// One link of the geocoder chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// ArcGIS `findAddressCandidates`.
    Arcgis {
        /// Geocoder endpoint.
        #[serde(default = "default_arcgis_endpoint")]
        endpoint: String,
        /// ISO country code restricting results.
        #[serde(default = "default_country_code")]
        country_code: String,
        /// Lowest accepted score.
        #[serde(default = "default_min_score")]
        min_score: f64,
    },
    /// Nominatim `search`.
    Nominatim {
        /// Search endpoint.
        #[serde(default = "default_nominatim_endpoint")]
        endpoint: String,
        /// Comma-separated lower-case country codes.
        #[serde(default = "default_country_codes")]
        country_codes: String,
        /// Score assigned to every Nominatim candidate.
        #[serde(default = "default_nominatim_score")]
        default_score: f64,
        /// Lowest accepted score.
        #[serde(default = "default_min_score")]
        min_score: f64,
    },
}

impl ProviderSettings {
    /// Default ArcGIS link.
    #[must_use]
    pub fn arcgis() -> Self {
        Self::Arcgis {
            endpoint: default_arcgis_endpoint(),
            country_code: default_country_code(),
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Default Nominatim link.
    #[must_use]
    pub fn nominatim() -> Self {
        Self::Nominatim {
            endpoint: default_nominatim_endpoint(),
            country_codes: default_country_codes(),
            default_score: default_nominatim_score(),
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Lowest score this link accepts.
    #[must_use]
    pub const fn min_score(&self) -> f64 {
        match self {
            Self::Arcgis { min_score, .. } | Self::Nominatim { min_score, .. } => *min_score,
        }
    }
}

fn default_arcgis_endpoint() -> String {
    DEFAULT_ARCGIS_GEOCODER.to_owned()
}

fn default_nominatim_endpoint() -> String {
    DEFAULT_NOMINATIM_ENDPOINT.to_owned()
}

fn default_country_code() -> String {
    "CO".to_owned()
}

fn default_country_codes() -> String {
    "co".to_owned()
}

const fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}

const fn default_nominatim_score() -> f64 {
    80.0
}

/// Settings for the enrichment pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingSettings {
    /// Providers in the order they are tried.
    pub providers: Vec<ProviderSettings>,
    /// Pause between addresses in milliseconds.
    pub request_delay_ms: u64,
    /// Addresses per progress line.
    pub batch_size: usize,
    /// Attempts between checkpoint writes.
    pub checkpoint_every: usize,
    /// Origin stamped on geocoded records.
    pub origin: Origin,
    /// Colour stamped on geocoded records.
    pub color: String,
    /// Address normalisation rules.
    pub address: AddressSettings,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            providers: vec![ProviderSettings::arcgis(), ProviderSettings::nominatim()],
            request_delay_ms: 1000,
            batch_size: 5,
            checkpoint_every: 10,
            origin: Origin::new("GEOCODED_STUDIES"),
            color: "#2979FF".to_owned(),
            address: AddressSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_chain_arcgis_then_nominatim() {
        let settings = GeocodingSettings::default();
        assert_eq!(
            settings.providers,
            [ProviderSettings::arcgis(), ProviderSettings::nominatim()]
        );
        assert_eq!(settings.checkpoint_every, 10);
    }

    #[rstest]
    fn provider_fields_fall_back_to_defaults() {
        let settings: GeocodingSettings = serde_json::from_str(
            r#"{ "providers": [ { "kind": "nominatim", "min_score": 60.0 } ], "batch_size": 2 }"#,
        )
        .expect("deserialise");
        assert_eq!(settings.batch_size, 2);
        assert_eq!(settings.request_delay_ms, 1000);
        match &settings.providers[..] {
            [ProviderSettings::Nominatim { endpoint, default_score, min_score, .. }] => {
                assert_eq!(endpoint, DEFAULT_NOMINATIM_ENDPOINT);
                assert_eq!(*default_score, 80.0);
                assert_eq!(*min_score, 60.0);
            }
            other => panic!("unexpected providers: {other:?}"),
        }
    }
}
