//! The read-only study index listing known locations without coordinates.

use std::collections::BTreeMap;

use camino::Utf8Path;
use nodeharvest_core::MergeStore;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading the study index.
#[derive(Debug, Error)]
pub enum StudyIndexError {
    /// The file does not exist.
    #[error("study index {path} does not exist")]
    Missing {
        /// Index path.
        path: String,
    },
    /// The file could not be read.
    #[error("failed to read study index {path}: {source}")]
    Read {
        /// Index path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a study index document.
    #[error("failed to parse study index {path}: {source}")]
    Parse {
        /// Index path.
        path: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

/// One location of the index.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StudyNode {
    /// Free-text address, if known.
    #[serde(default)]
    pub address: Option<String>,
    /// Studies recorded at this location.
    #[serde(default)]
    pub studies: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StudyIndexDocument {
    #[serde(default)]
    nodes: BTreeMap<String, StudyNode>,
}

/// A location still lacking coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNode {
    /// Location identifier, shared with the store.
    pub id: String,
    /// Address as written in the index.
    pub address: String,
    /// Number of studies at the location.
    pub study_count: usize,
}

/// Study index keyed by location identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyIndex {
    nodes: BTreeMap<String, StudyNode>,
}

impl StudyIndex {
    /// Build an index from `nodes`.
    #[must_use]
    pub const fn from_nodes(nodes: BTreeMap<String, StudyNode>) -> Self {
        Self { nodes }
    }

    /// Load the index at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StudyIndexError`] when the file is absent, unreadable or
    /// malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, StudyIndexError> {
        let contents = nodeharvest_fs::read_optional_to_string(path)
            .map_err(|source| StudyIndexError::Read {
                path: path.to_string(),
                source,
            })?
            .ok_or_else(|| StudyIndexError::Missing {
                path: path.to_string(),
            })?;
        let document: StudyIndexDocument =
            serde_json::from_str(&contents).map_err(|source| StudyIndexError::Parse {
                path: path.to_string(),
                source,
            })?;
        Ok(Self::from_nodes(document.nodes))
    }

    /// Number of locations in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Locations with an address whose id is absent from `store`, in
    /// ascending id order.
    #[must_use]
    pub fn pending(&self, store: &MergeStore) -> Vec<PendingNode> {
        self.nodes
            .iter()
            .filter(|(id, _)| !store.contains(id))
            .filter_map(|(id, node)| {
                let address = node.address.as_deref().map(str::trim)?;
                (!address.is_empty()).then(|| PendingNode {
                    id: id.clone(),
                    address: address.to_owned(),
                    study_count: node.studies.len(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use nodeharvest_core::test_support::point_record;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn pending_skips_known_ids_and_blank_addresses() {
        let index: StudyIndexDocument = serde_json::from_str(
            r#"{ "nodes": {
                "300": { "address": "KR_7_X_CL_72", "studies": [1, 2, 3] },
                "100": { "address": "AK_45_X_CL_245", "studies": [] },
                "200": { "address": "   " },
                "150": { "studies": [1] },
                "400": { "address": "DG_40", "studies": [1] }
            } }"#,
        )
        .expect("document");
        let index = StudyIndex::from_nodes(index.nodes);
        let mut store = MergeStore::new();
        store.merge([point_record("400", "SDM", -74.1, 4.6)]);

        let pending = index.pending(&store);
        let ids: Vec<&str> = pending.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, ["100", "300"]);
        assert_eq!(pending[1].study_count, 3);
    }

    #[rstest]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("studies.json")).expect("utf8");
        assert!(matches!(
            StudyIndex::load(&path),
            Err(StudyIndexError::Missing { .. })
        ));
    }

    #[rstest]
    fn loads_from_disk() {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("studies.json")).expect("utf8");
        std::fs::write(&path, r#"{ "nodes": { "7": { "address": "CL_1" } } }"#).expect("write");
        let index = StudyIndex::load(&path).expect("load");
        assert_eq!(index.len(), 1);
    }
}
