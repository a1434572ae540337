//! Identifier-keyed accumulation of records across runs and sources.
//!
//! [`MergeStore`] keeps records in insertion order with an id index on the
//! side. Merging is strictly additive: an incoming record whose id is
//! already present is dropped, never used to overwrite. Persistence writes
//! a GeoJSON feature collection with a metadata block recomputed from the
//! final contents.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{CanonicalGeometry, Category, Enrichment, Origin, Record, value_text};

const COLLECTION_TYPE: &str = "FeatureCollection";
const FEATURE_TYPE: &str = "Feature";

/// Counts produced by [`MergeStore::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records inserted because their id was new.
    pub inserted: usize,
    /// Records skipped because their id was already present.
    pub duplicates: usize,
}

impl MergeOutcome {
    /// Combine two outcomes.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            inserted: self.inserted + other.inserted,
            duplicates: self.duplicates + other.duplicates,
        }
    }
}

/// Counts produced by [`MergeStore::filter_origins`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Records still present after filtering.
    pub kept: usize,
    /// Removed records per origin.
    pub removed: BTreeMap<Origin, usize>,
}

impl FilterOutcome {
    /// Total number of removed records.
    #[must_use]
    pub fn removed_total(&self) -> usize {
        self.removed.values().sum()
    }
}

/// Errors raised while loading or persisting a [`MergeStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Reading the persisted collection failed.
    #[error("failed to read collection at {path}: {source}")]
    Read {
        /// Location of the collection.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The persisted collection was not valid JSON for a feature collection.
    #[error("failed to parse collection at {path}: {source}")]
    Parse {
        /// Location of the collection.
        path: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The document's type tag was not `FeatureCollection`.
    #[error("collection at {path} has type {found:?}, expected \"FeatureCollection\"")]
    NotACollection {
        /// Location of the collection.
        path: String,
        /// Type tag found in the document.
        found: String,
    },
    /// Encoding the collection failed.
    #[error("failed to encode collection: {0}")]
    Encode(#[source] serde_json::Error),
    /// Writing the collection failed.
    #[error("failed to write collection to {path}: {source}")]
    Write {
        /// Location of the collection.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Metadata block written alongside the features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Number of features in the collection.
    pub total_features: usize,
    /// Contributing origins, sorted.
    pub sources: Vec<Origin>,
    /// Feature count per origin.
    pub counts_by_origin: BTreeMap<Origin, usize>,
    /// When the collection was written.
    pub generated_at: DateTime<Utc>,
}

/// Insertion-ordered, id-keyed record collection.
///
/// # Examples
///
/// ```
/// use nodeharvest_core::{Category, MergeStore, Origin, Record};
///
/// let record = Record {
///     id: "N-1".to_owned(),
///     label: "Calle 26".to_owned(),
///     geometry: None,
///     origin: Origin::new("SDM"),
///     category: Category::Infrastructure,
///     color: "#00C853".to_owned(),
///     raw_attributes: serde_json::Map::new(),
///     enrichment: None,
/// };
/// let mut store = MergeStore::new();
/// let first = store.merge(vec![record.clone()]);
/// let second = store.merge(vec![record]);
/// assert_eq!((first.inserted, second.duplicates), (1, 1));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStore {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl MergeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record with `id` is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).and_then(|&slot| self.records.get(slot))
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Insert every record whose id is new; skip the rest.
    pub fn merge<I>(&mut self, incoming: I) -> MergeOutcome
    where
        I: IntoIterator<Item = Record>,
    {
        let mut outcome = MergeOutcome::default();
        for record in incoming {
            if self.index.contains_key(&record.id) {
                outcome.duplicates += 1;
                continue;
            }
            self.index.insert(record.id.clone(), self.records.len());
            self.records.push(record);
            outcome.inserted += 1;
        }
        outcome
    }

    /// Remove every record whose origin is not in `allow`.
    pub fn filter_origins(&mut self, allow: &BTreeSet<Origin>) -> FilterOutcome {
        let mut removed: BTreeMap<Origin, usize> = BTreeMap::new();
        self.records.retain(|record| {
            let keep = allow.contains(&record.origin);
            if !keep {
                *removed.entry(record.origin.clone()).or_insert(0) += 1;
            }
            keep
        });
        self.reindex();
        FilterOutcome {
            kept: self.records.len(),
            removed,
        }
    }

    /// Record count per origin.
    #[must_use]
    pub fn counts_by_origin(&self) -> BTreeMap<Origin, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.origin.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Metadata describing the current contents.
    #[must_use]
    pub fn metadata(&self, generated_at: DateTime<Utc>) -> CollectionMetadata {
        let counts_by_origin = self.counts_by_origin();
        CollectionMetadata {
            total_features: self.records.len(),
            sources: counts_by_origin.keys().cloned().collect(),
            counts_by_origin,
            generated_at,
        }
    }

    /// Load a persisted collection. A missing file yields an empty store.
    ///
    /// Features without an identifier are skipped with a warning; repeated
    /// identifiers keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be read or is not a
    /// feature collection.
    pub fn load(path: &Utf8Path) -> Result<Self, StoreError> {
        let contents =
            nodeharvest_fs::read_optional_to_string(path).map_err(|source| StoreError::Read {
                path: path.to_string(),
                source,
            })?;
        let Some(contents) = contents else {
            return Ok(Self::new());
        };
        let document: CollectionDocument =
            serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.to_string(),
                source,
            })?;
        if document.kind != COLLECTION_TYPE {
            return Err(StoreError::NotACollection {
                path: path.to_string(),
                found: document.kind,
            });
        }
        let mut store = Self::new();
        let mut skipped = 0_usize;
        let records = document.features.into_iter().filter_map(|feature| {
            let record = Record::try_from(feature).ok();
            if record.is_none() {
                skipped += 1;
            }
            record
        });
        let merged = store.merge(records.collect::<Vec<_>>());
        if skipped > 0 || merged.duplicates > 0 {
            warn!(
                "{path}: skipped {skipped} features without id and {} repeated ids",
                merged.duplicates
            );
        }
        Ok(store)
    }

    /// Write the collection with freshly computed metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or writing fails.
    pub fn persist(&self, path: &Utf8Path) -> Result<(), StoreError> {
        self.persist_at(path, Utc::now())
    }

    /// Write the collection stamping `generated_at` into the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or writing fails.
    pub fn persist_at(&self, path: &Utf8Path, generated_at: DateTime<Utc>) -> Result<(), StoreError> {
        let document = CollectionDocument {
            kind: COLLECTION_TYPE.to_owned(),
            features: self.records.iter().map(FeatureDocument::from).collect(),
            metadata: Some(self.metadata(generated_at)),
        };
        let payload = serde_json::to_vec_pretty(&document).map_err(StoreError::Encode)?;
        nodeharvest_fs::write_atomic(path, &payload).map_err(|source| StoreError::Write {
            path: path.to_string(),
            source,
        })
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.id.clone(), slot))
            .collect();
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<FeatureDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<CollectionMetadata>,
}

/// One record in its on-disk feature form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    geometry: Option<CanonicalGeometry>,
    properties: FeatureProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    label: String,
    origin: Origin,
    category: Category,
    #[serde(default)]
    color: String,
    #[serde(default)]
    raw_attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    geocoded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geocode_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geocoded_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    study_count: Option<usize>,
}

impl From<&Record> for FeatureDocument {
    fn from(record: &Record) -> Self {
        let enrichment = record.enrichment.as_ref();
        Self {
            kind: FEATURE_TYPE.to_owned(),
            geometry: record.geometry.clone(),
            properties: FeatureProperties {
                id: Value::String(record.id.clone()),
                label: record.label.clone(),
                origin: record.origin.clone(),
                category: record.category,
                color: record.color.clone(),
                raw_attributes: record.raw_attributes.clone(),
                geocoded: enrichment.is_some(),
                geocode_score: enrichment.map(|extra| extra.geocode_score),
                geocoded_address: enrichment.map(|extra| extra.geocoded_address.clone()),
                study_count: enrichment.map(|extra| extra.study_count),
            },
        }
    }
}

/// Raised when a persisted feature has no usable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("feature has no identifier")]
pub struct MissingFeatureId;

impl TryFrom<FeatureDocument> for Record {
    type Error = MissingFeatureId;

    fn try_from(feature: FeatureDocument) -> Result<Self, Self::Error> {
        let properties = feature.properties;
        let id = value_text(&properties.id).ok_or(MissingFeatureId)?;
        let enrichment = properties.geocoded.then(|| Enrichment {
            geocode_score: properties.geocode_score.unwrap_or_default(),
            geocoded_address: properties.geocoded_address.clone().unwrap_or_default(),
            study_count: properties.study_count.unwrap_or_default(),
        });
        Ok(Self {
            id,
            label: properties.label,
            geometry: feature.geometry,
            origin: properties.origin,
            category: properties.category,
            color: properties.color,
            raw_attributes: properties.raw_attributes,
            enrichment,
        })
    }
}
