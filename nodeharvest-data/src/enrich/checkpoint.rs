//! Durable progress of an enrichment pass.

use std::collections::BTreeSet;

use camino::Utf8Path;
use log::warn;
use nodeharvest_core::{FeatureDocument, Record};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or writing a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint could not be read.
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        /// Checkpoint path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The checkpoint is not valid JSON.
    #[error("failed to parse checkpoint {path}: {source}")]
    Parse {
        /// Checkpoint path.
        path: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The checkpoint could not be encoded.
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[source] serde_json::Error),
    /// The checkpoint could not be written or removed.
    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        /// Checkpoint path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Identifiers already attempted plus the records resolved so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCheckpoint {
    #[serde(default)]
    processed_ids: BTreeSet<String>,
    #[serde(default)]
    resolved: Vec<FeatureDocument>,
}

impl GeocodeCheckpoint {
    /// Load the checkpoint at `path`; a missing file is a fresh start.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self, CheckpointError> {
        let contents =
            nodeharvest_fs::read_optional_to_string(path).map_err(|source| CheckpointError::Read {
                path: path.to_string(),
                source,
            })?;
        let Some(contents) = contents else {
            return Ok(Self::default());
        };
        serde_json::from_str(&contents).map_err(|source| CheckpointError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Atomically write the checkpoint to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when encoding or writing fails.
    pub fn save(&self, path: &Utf8Path) -> Result<(), CheckpointError> {
        let encoded = serde_json::to_vec_pretty(self).map_err(CheckpointError::Encode)?;
        nodeharvest_fs::write_atomic(path, &encoded).map_err(|source| CheckpointError::Write {
            path: path.to_string(),
            source,
        })
    }

    /// Remove the checkpoint file. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Write`] when the file cannot be removed.
    pub fn clear(path: &Utf8Path) -> Result<bool, CheckpointError> {
        nodeharvest_fs::remove_file_if_exists(path).map_err(|source| CheckpointError::Write {
            path: path.to_string(),
            source,
        })
    }

    /// Whether `id` was already attempted.
    #[must_use]
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed_ids.contains(id)
    }

    /// Record an attempt that produced nothing.
    pub fn mark_failed(&mut self, id: &str) {
        self.processed_ids.insert(id.to_owned());
    }

    /// Record an attempt that produced `record`.
    pub fn mark_resolved(&mut self, record: &Record) {
        self.processed_ids.insert(record.id.clone());
        self.resolved.push(FeatureDocument::from(record));
    }

    /// Number of attempted identifiers.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed_ids.len()
    }

    /// Number of resolved records.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Resolved records, skipping entries that lost their identifier.
    #[must_use]
    pub fn resolved_records(&self) -> Vec<Record> {
        let records: Vec<Record> = self
            .resolved
            .iter()
            .cloned()
            .filter_map(|feature| Record::try_from(feature).ok())
            .collect();
        if records.len() < self.resolved.len() {
            warn!(
                "checkpoint held {} resolved entries without an id",
                self.resolved.len() - records.len()
            );
        }
        records
    }
}
