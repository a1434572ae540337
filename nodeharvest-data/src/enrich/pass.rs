//! The enrichment pass: geocode pending study locations into the store.
//!
//! Progress lives in a caller-owned [`GeocodeCheckpoint`] cell so that an
//! interrupted run can flush it. Identifiers already in the checkpoint are
//! never attempted again.

use std::cell::RefCell;
use std::time::Duration;

use camino::Utf8Path;
use log::info;
use nodeharvest_core::{
    Category, Enrichment, MergeOutcome, MergeStore, Origin, Record, StoreError, point_from_lon_lat,
};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{
    AddressNormalizer, CheckpointError, GeocodeCheckpoint, GeocoderChain, GeocodingSettings,
    PendingNode, ResolvedAddress, StudyIndex,
};

/// Errors that stop an enrichment pass.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Progress could not be saved or cleared.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    /// The store could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where a pass keeps its durable state.
#[derive(Debug, Clone, Copy)]
pub struct PassPaths<'a> {
    /// Merge store file.
    pub store: &'a Utf8Path,
    /// Checkpoint file.
    pub checkpoint: &'a Utf8Path,
}

/// Counters describing a completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Locations with an address and no store entry.
    pub candidates: usize,
    /// Candidates skipped because the checkpoint already held them.
    pub already_processed: usize,
    /// Locations attempted in this run.
    pub attempted: usize,
    /// Attempts that produced a record.
    pub resolved: usize,
    /// Attempts that produced nothing.
    pub failed: usize,
    /// Result of merging every resolved record.
    pub merge: MergeOutcome,
}

/// Geocodes study locations one at a time.
#[derive(Debug)]
pub struct EnrichmentPass<'a> {
    chain: &'a GeocoderChain,
    normalizer: AddressNormalizer,
    delay: Duration,
    batch_size: usize,
    checkpoint_every: usize,
    origin: Origin,
    color: String,
}

impl<'a> EnrichmentPass<'a> {
    /// Build a pass over `chain` configured by `settings`.
    #[must_use]
    pub fn new(chain: &'a GeocoderChain, settings: &GeocodingSettings) -> Self {
        Self {
            chain,
            normalizer: AddressNormalizer::new(settings.address.clone()),
            delay: Duration::from_millis(settings.request_delay_ms),
            batch_size: settings.batch_size.max(1),
            checkpoint_every: settings.checkpoint_every.max(1),
            origin: settings.origin.clone(),
            color: settings.color.clone(),
        }
    }

    /// Geocode every pending location, merge the results and persist.
    ///
    /// The checkpoint is saved every `checkpoint_every` attempts and removed
    /// once the store has been written.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] when the checkpoint or the store cannot be
    /// written.
    pub async fn run(
        &self,
        studies: &StudyIndex,
        store: &mut MergeStore,
        paths: PassPaths<'_>,
        checkpoint: &RefCell<GeocodeCheckpoint>,
    ) -> Result<EnrichmentReport, EnrichError> {
        let pending = studies.pending(store);
        let mut report = EnrichmentReport {
            candidates: pending.len(),
            ..EnrichmentReport::default()
        };
        let todo: Vec<&PendingNode> = {
            let progress = checkpoint.borrow();
            pending
                .iter()
                .filter(|node| !progress.is_processed(&node.id))
                .collect()
        };
        report.already_processed = report.candidates - todo.len();
        info!(
            "{} locations to geocode ({} already processed)",
            todo.len(),
            report.already_processed
        );

        for (index, node) in todo.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.attempt(node).await {
                Some(record) => {
                    checkpoint.borrow_mut().mark_resolved(&record);
                    report.resolved += 1;
                }
                None => {
                    checkpoint.borrow_mut().mark_failed(&node.id);
                    report.failed += 1;
                }
            }
            report.attempted += 1;

            if report.attempted % self.checkpoint_every == 0 {
                checkpoint.borrow().save(paths.checkpoint)?;
            }
            if report.attempted % self.batch_size == 0 || report.attempted == todo.len() {
                info!(
                    "geocoded {}/{} ({} resolved, {} failed)",
                    report.attempted,
                    todo.len(),
                    report.resolved,
                    report.failed
                );
            }
        }

        let resolved = checkpoint.borrow().resolved_records();
        report.merge = store.merge(resolved);
        store.persist(paths.store)?;
        if GeocodeCheckpoint::clear(paths.checkpoint)? {
            info!("removed checkpoint {}", paths.checkpoint);
        }
        Ok(report)
    }

    async fn attempt(&self, node: &PendingNode) -> Option<Record> {
        let address = self.normalizer.normalize(&node.address)?;
        let resolved = self.chain.resolve(&address).await?;
        Some(self.record(node, resolved))
    }

    fn record(&self, node: &PendingNode, resolved: ResolvedAddress) -> Record {
        let candidate = resolved.candidate;
        let mut raw_attributes = Map::new();
        raw_attributes.insert("address".to_owned(), Value::String(node.address.clone()));
        Record {
            id: node.id.clone(),
            label: node.address.clone(),
            geometry: Some(point_from_lon_lat(candidate.longitude, candidate.latitude)),
            origin: self.origin.clone(),
            category: Category::ManualSurvey,
            color: self.color.clone(),
            raw_attributes,
            enrichment: Some(Enrichment {
                geocode_score: candidate.score,
                geocoded_address: candidate.address,
                study_count: node.study_count,
            }),
        }
    }
}
