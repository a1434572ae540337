//! Facade crate for the traffic-node harvest engine.
//!
//! This crate re-exports the domain types from `nodeharvest-core` and the
//! harvest and enrichment drivers from `nodeharvest-data`.

#![forbid(unsafe_code)]

pub use nodeharvest_core::{
    BoundingBox, CandidateTable, Category, FilterOutcome, HarvestSourceConfig, MergeOutcome,
    MergeStore, Origin, RawRecord, Record, RecordNormalizer, RejectionReason, Role, SourceKind,
    StoreError,
};
pub use nodeharvest_data::enrich::{EnrichmentPass, EnrichmentReport, GeocoderChain};
pub use nodeharvest_data::{
    ConfigError, HarvestConfig, Harvester, HttpClientConfig, HttpConnector, SourceReport,
};
