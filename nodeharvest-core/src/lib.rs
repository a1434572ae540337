//! Core domain logic for the traffic-node harvest.
//!
//! This crate is free of network I/O. It converts provider geometries,
//! resolves field roles, normalises raw elements into [`Record`]s and
//! accumulates them in a [`MergeStore`]. Remote access lives in
//! `nodeharvest-data`.

mod bounds;
mod geometry;
mod normalizer;
mod record;
mod resolver;
mod source;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bounds::BoundingBox;
pub use geometry::{CanonicalGeometry, normalize_geometry, point_from_lon_lat};
pub use normalizer::{
    NormalizeOutcome, RawRecord, RecordNormalizer, RejectionReason, UnusableSource,
};
pub use record::{Category, Enrichment, Origin, Record, value_text};
pub use resolver::{CandidateTable, FieldResolution, Role, fold, resolve_fields};
pub use source::{GeometryMode, HarvestSourceConfig, SourceKind};
pub use store::{
    CollectionMetadata, FeatureDocument, FilterOutcome, MergeOutcome, MergeStore,
    MissingFeatureId, StoreError,
};
