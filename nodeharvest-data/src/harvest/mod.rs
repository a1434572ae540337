//! Sequential harvest of every configured source into a merge store.

mod report;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;


use std::cell::RefCell;
use std::time::Duration;

use log::{debug, info, warn};
use nodeharvest_core::{
    BoundingBox, CandidateTable, HarvestSourceConfig, MergeStore, Record, RecordNormalizer,
};
use reqwest::Client;

use crate::config::HarvestConfig;
use crate::fetch::{
    FeatureSource, FetchError, FetchOutcome, HttpFeatureSource, PaginationOptions, fetch_all,
};
use crate::http::{ClientBuildError, HttpClientConfig};

pub use report::SourceReport;

/// Opens a [`FeatureSource`] for one endpoint of a source.
pub trait SourceConnector {
    /// Connect to `endpoint`, one of `source`'s endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the endpoint cannot be used.
    fn connect(
        &self,
        source: &HarvestSourceConfig,
        endpoint: &str,
    ) -> Result<Box<dyn FeatureSource>, FetchError>;
}

/// Connector producing [`HttpFeatureSource`]s over one shared client.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    timeout_secs: u64,
}

impl HttpConnector {
    /// Build the shared client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the client cannot be built.
    pub fn new(config: &HttpClientConfig) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: config.build_client()?,
            timeout_secs: config.timeout_secs,
        })
    }
}

impl SourceConnector for HttpConnector {
    fn connect(
        &self,
        source: &HarvestSourceConfig,
        endpoint: &str,
    ) -> Result<Box<dyn FeatureSource>, FetchError> {
        let feature_source =
            HttpFeatureSource::new(self.client.clone(), source.kind, endpoint, self.timeout_secs)?;
        Ok(Box::new(feature_source))
    }
}

/// Drives fetching, normalisation and merging for each source in turn.
pub struct Harvester<'a, C: SourceConnector + ?Sized> {
    connector: &'a C,
    options: PaginationOptions,
    bounds: BoundingBox,
    candidates: CandidateTable,
}

impl<'a, C: SourceConnector + ?Sized> Harvester<'a, C> {
    /// Build a harvester with explicit settings.
    #[must_use]
    pub const fn new(
        connector: &'a C,
        options: PaginationOptions,
        bounds: BoundingBox,
        candidates: CandidateTable,
    ) -> Self {
        Self {
            connector,
            options,
            bounds,
            candidates,
        }
    }

    /// Build a harvester from the harvest configuration.
    #[must_use]
    pub fn from_config(connector: &'a C, config: &HarvestConfig) -> Self {
        let options = PaginationOptions::new(config.page_size)
            .with_delay(Duration::from_millis(config.page_delay_ms))
            .with_max_pages(config.max_pages);
        Self::new(
            connector,
            options,
            config.bounds,
            CandidateTable::default().with_overrides(&config.field_candidates),
        )
    }

    /// Harvest every source into `store`, appending one report per source
    /// to `reports` as soon as it completes.
    pub async fn harvest_all(
        &self,
        sources: &[HarvestSourceConfig],
        store: &mut MergeStore,
        reports: &RefCell<Vec<SourceReport>>,
    ) {
        for (position, source) in sources.iter().enumerate() {
            info!(
                "harvesting source {}/{}: {}",
                position + 1,
                sources.len(),
                source.name
            );
            let report = self.harvest_source(source, store).await;
            info!("{report}");
            reports.borrow_mut().push(report);
        }
    }

    /// Harvest one source into `store`.
    ///
    /// Alternate endpoints are tried only while the previous endpoint ended
    /// with an error and produced nothing.
    pub async fn harvest_source(
        &self,
        source: &HarvestSourceConfig,
        store: &mut MergeStore,
    ) -> SourceReport {
        let mut report = SourceReport::new(source.name.as_str(), source.origin.clone());
        let Some(outcome) = self.fetch_with_fallback(source, &mut report).await else {
            return report;
        };
        report.fetched = outcome.records.len();
        report.termination = Some(outcome.termination);
        report.error = outcome.error.as_ref().map(ToString::to_string);

        let Some(records) = self.normalize(source, outcome, &mut report) else {
            return report;
        };
        report.accepted = records.len();
        report.merge = store.merge(records);
        report
    }

    async fn fetch_with_fallback(
        &self,
        source: &HarvestSourceConfig,
        report: &mut SourceReport,
    ) -> Option<FetchOutcome> {
        let endpoints: Vec<&str> = source.endpoints().collect();
        let last = endpoints.len().saturating_sub(1);
        for (attempt, endpoint) in endpoints.into_iter().enumerate() {
            if attempt > 0 {
                info!("trying alternate endpoint {endpoint} for {}", source.name);
            }
            let feature_source = match self.connector.connect(source, endpoint) {
                Ok(feature_source) => feature_source,
                Err(err) => {
                    warn!("cannot use endpoint {endpoint} for {}: {err}", source.name);
                    report.error = Some(err.to_string());
                    continue;
                }
            };
            let known_total = match feature_source.fetch_count().await {
                Ok(total) => {
                    debug!("{endpoint} reports {total} records");
                    Some(total)
                }
                Err(err) => {
                    debug!("count unavailable for {endpoint}: {err}");
                    None
                }
            };
            let outcome = fetch_all(&*feature_source, &self.options, known_total).await;
            report.requests += outcome.requests;
            report.endpoint = Some(endpoint.to_owned());
            if outcome.records.is_empty() && outcome.failed() && attempt < last {
                if let Some(err) = &outcome.error {
                    warn!("endpoint {endpoint} for {} failed: {err}", source.name);
                }
                continue;
            }
            return Some(outcome);
        }
        None
    }

    fn normalize(
        &self,
        source: &HarvestSourceConfig,
        outcome: FetchOutcome,
        report: &mut SourceReport,
    ) -> Option<Vec<Record>> {
        let Some(sample) = outcome.records.first() else {
            return Some(Vec::new());
        };
        let normalizer =
            match RecordNormalizer::for_source(source, &self.candidates, self.bounds, sample) {
                Ok(normalizer) => normalizer,
                Err(unusable) => {
                    warn!("{unusable}");
                    report.unusable = Some(unusable.missing);
                    return None;
                }
            };
        debug!("{} field mapping: {:?}", source.name, normalizer.resolution());
        let normalized = normalizer.normalize_batch(outcome.records);
        report.rejected = normalized.rejected;
        Some(normalized.records)
    }
}
