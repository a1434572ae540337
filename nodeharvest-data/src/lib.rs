//! Remote access for the traffic-node harvest.
//!
//! Responsibilities:
//! - Page through ArcGIS and Socrata endpoints ([`fetch`]).
//! - Drive the per-source harvest into a merge store ([`harvest`]).
//! - Geocode study locations through a provider chain ([`enrich`]).
//! - Load the JSON harvest configuration ([`config`]).
//!
//! Boundaries:
//! - Domain rules (field resolution, normalisation, merging) live in
//!   `nodeharvest-core`.
//! - Requests are issued one at a time; nothing here spawns tasks.
//!
//! Invariants:
//! - No global mutable state; every setting is passed in.
#![forbid(unsafe_code)]

pub mod config;
pub mod enrich;
pub mod fetch;
pub mod harvest;
pub mod http;

pub use config::{ConfigError, HarvestConfig};
pub use harvest::{Harvester, HttpConnector, SourceConnector, SourceReport};
pub use http::{ClientBuildError, HttpClientConfig, TransportError};
