//! Ordered fallback across geocoding providers.

use log::{debug, warn};
use nodeharvest_core::BoundingBox;
use reqwest::Client;

use super::{
    ArcgisGeocoder, GeocodeCandidate, Geocoder, GeocodingSettings, NominatimGeocoder,
    ProviderSettings,
};
use crate::http::{ClientBuildError, HttpClientConfig};

struct ChainLink {
    geocoder: Box<dyn Geocoder>,
    min_score: f64,
}

/// A candidate accepted by the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    /// Accepted candidate.
    pub candidate: GeocodeCandidate,
    /// Name of the provider that produced it.
    pub provider: String,
}

/// Providers tried in order until one yields an acceptable candidate.
///
/// A candidate is acceptable when its score reaches the link's minimum and
/// its position passes the bounding-box checks. Provider errors are logged
/// and the next link is tried.
pub struct GeocoderChain {
    links: Vec<ChainLink>,
    bounds: BoundingBox,
}

impl std::fmt::Debug for GeocoderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocoderChain")
            .field(
                "links",
                &self
                    .links
                    .iter()
                    .map(|link| (link.geocoder.name(), link.min_score))
                    .collect::<Vec<_>>(),
            )
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl GeocoderChain {
    /// Empty chain checking candidates against `bounds`.
    #[must_use]
    pub const fn new(bounds: BoundingBox) -> Self {
        Self {
            links: Vec::new(),
            bounds,
        }
    }

    /// Append `geocoder`, accepting scores of at least `min_score`.
    #[must_use]
    pub fn with_provider(mut self, geocoder: Box<dyn Geocoder>, min_score: f64) -> Self {
        self.links.push(ChainLink {
            geocoder,
            min_score,
        });
        self
    }

    /// Build the configured HTTP providers sharing one client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn from_settings(
        settings: &GeocodingSettings,
        http: &HttpClientConfig,
        bounds: BoundingBox,
    ) -> Result<Self, ClientBuildError> {
        let client = http.build_client()?;
        Ok(settings
            .providers
            .iter()
            .fold(Self::new(bounds), |chain, provider| {
                let geocoder = build_provider(provider, &client, http);
                chain.with_provider(geocoder, provider.min_score())
            }))
    }

    /// Number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Resolve `address` with the first provider giving an acceptable answer.
    pub async fn resolve(&self, address: &str) -> Option<ResolvedAddress> {
        for link in &self.links {
            let name = link.geocoder.name();
            match link.geocoder.geocode(address).await {
                Ok(Some(candidate)) if self.accepts(link, &candidate) => {
                    return Some(ResolvedAddress {
                        candidate,
                        provider: name.to_owned(),
                    });
                }
                Ok(Some(candidate)) => debug!(
                    "{name} candidate for {address:?} rejected (score {}, at {}, {})",
                    candidate.score, candidate.longitude, candidate.latitude
                ),
                Ok(None) => debug!("{name} found no candidate for {address:?}"),
                Err(err) => warn!("{name} failed for {address:?}: {err}"),
            }
        }
        None
    }

    fn accepts(&self, link: &ChainLink, candidate: &GeocodeCandidate) -> bool {
        candidate.score >= link.min_score
            && self
                .bounds
                .validate(candidate.longitude, candidate.latitude)
                .is_ok()
    }
}

fn build_provider(
    provider: &ProviderSettings,
    client: &Client,
    http: &HttpClientConfig,
) -> Box<dyn Geocoder> {
    match provider {
        ProviderSettings::Arcgis {
            endpoint,
            country_code,
            ..
        } => Box::new(ArcgisGeocoder::new(
            client.clone(),
            endpoint.as_str(),
            country_code.as_str(),
            http.timeout_secs,
        )),
        ProviderSettings::Nominatim {
            endpoint,
            country_codes,
            default_score,
            ..
        } => Box::new(
            NominatimGeocoder::new(client.clone(), endpoint.as_str(), http.timeout_secs)
                .with_country_codes(country_codes.as_str())
                .with_user_agent(http.user_agent.as_str())
                .with_default_score(*default_score),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::test_support::StubGeocoder;
    use crate::fetch::test_support::block_on_for_tests;
    use rstest::rstest;

    fn candidate(score: f64, longitude: f64, latitude: f64) -> GeocodeCandidate {
        GeocodeCandidate {
            longitude,
            latitude,
            score,
            address: "somewhere".to_owned(),
        }
    }

    #[rstest]
    fn first_acceptable_answer_wins() {
        let primary = StubGeocoder::answering("primary", candidate(95.0, -74.1, 4.6));
        let fallback = StubGeocoder::answering("fallback", candidate(80.0, -74.2, 4.7));
        let fallback_calls = fallback.calls();
        let chain = GeocoderChain::new(BoundingBox::default())
            .with_provider(Box::new(primary), 70.0)
            .with_provider(Box::new(fallback), 70.0);

        let resolved = block_on_for_tests(chain.resolve("CL 1")).expect("resolved");
        assert_eq!(resolved.provider, "primary");
        assert_eq!(fallback_calls.get(), 0);
    }

    #[rstest]
    #[case::low_score(candidate(65.0, -74.1, 4.6))]
    #[case::out_of_bounds(candidate(99.0, -74.1, 10.5))]
    #[case::zero(candidate(99.0, 0.0, 4.6))]
    fn unacceptable_primary_falls_through(#[case] primary_answer: GeocodeCandidate) {
        let chain = GeocoderChain::new(BoundingBox::default())
            .with_provider(Box::new(StubGeocoder::answering("primary", primary_answer)), 70.0)
            .with_provider(
                Box::new(StubGeocoder::answering("fallback", candidate(80.0, -74.2, 4.7))),
                70.0,
            );

        let resolved = block_on_for_tests(chain.resolve("CL 1")).expect("resolved");
        assert_eq!(resolved.provider, "fallback");
    }

    #[rstest]
    fn provider_errors_fall_through() {
        let chain = GeocoderChain::new(BoundingBox::default())
            .with_provider(Box::new(StubGeocoder::failing("primary")), 70.0)
            .with_provider(
                Box::new(StubGeocoder::answering("fallback", candidate(80.0, -74.2, 4.7))),
                70.0,
            );
        assert!(block_on_for_tests(chain.resolve("CL 1")).is_some());
    }

    #[rstest]
    fn exhausted_chain_yields_none() {
        let chain = GeocoderChain::new(BoundingBox::default())
            .with_provider(Box::new(StubGeocoder::empty("primary")), 70.0)
            .with_provider(Box::new(StubGeocoder::failing("fallback")), 70.0);
        assert_eq!(block_on_for_tests(chain.resolve("CL 1")), None);
    }

    #[rstest]
    fn settings_build_every_provider() {
        let chain = GeocoderChain::from_settings(
            &GeocodingSettings::default(),
            &HttpClientConfig::default(),
            BoundingBox::default(),
        )
        .expect("client");
        assert_eq!(chain.len(), 2);
    }
}
