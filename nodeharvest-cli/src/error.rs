//! Error types emitted by the CLI.
//!
//! Keep this error type reasonably small, as every command returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use nodeharvest_core::StoreError;
use nodeharvest_data::enrich::{CheckpointError, EnrichError, StudyIndexError};
use nodeharvest_data::{ClientBuildError, ConfigError};
use thiserror::Error;

/// Errors emitted by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The harvest configuration file is missing or invalid.
    #[error(transparent)]
    HarvestConfig(#[from] ConfigError),
    /// Loading or persisting the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The study index could not be loaded.
    #[error(transparent)]
    StudyIndex(#[from] StudyIndexError),
    /// The geocoding checkpoint could not be read or written.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    /// The enrichment pass could not write its results.
    #[error(transparent)]
    Enrich(#[from] EnrichError),
    /// The HTTP client could not be built.
    #[error(transparent)]
    HttpClient(#[from] ClientBuildError),
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// No geocoding provider is configured.
    #[error("no geocoding providers configured")]
    NoGeocoders,
    /// Every harvested source failed.
    #[error("all {attempted} sources failed; store left untouched")]
    NoSourceSucceeded { attempted: usize },
}
