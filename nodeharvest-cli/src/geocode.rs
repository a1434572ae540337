//! Geocode command implementation.

use std::cell::RefCell;
use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{info, warn};
use nodeharvest_core::MergeStore;
use nodeharvest_data::HarvestConfig;
use nodeharvest_data::enrich::{
    EnrichmentPass, GeocodeCheckpoint, GeocoderChain, GeocodingSettings, PassPaths, StudyIndex,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CHECKPOINT, ARG_CONFIG, ARG_STORE, ARG_STUDIES, CliError, CommandOutcome,
    ENV_GEOCODE_CONFIG, ENV_GEOCODE_STORE, ENV_GEOCODE_STUDIES,
};

const CHECKPOINT_SUFFIX: &str = ".geocode-progress.json";

/// CLI arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Geocode the addresses of study locations that are not yet \
                 in the store through the configured provider chain. \
                 Progress is checkpointed so an interrupted run resumes \
                 where it stopped.",
    about = "Geocode study locations into the store"
)]
#[ortho_config(prefix = "NODEHARVEST")]
pub(crate) struct GeocodeArgs {
    /// Path to the JSON harvest configuration.
    #[arg(long = ARG_CONFIG, value_name = "path")]
    #[serde(default)]
    pub(crate) config_path: Option<Utf8PathBuf>,
    /// Path to the GeoJSON store.
    #[arg(long = ARG_STORE, value_name = "path")]
    #[serde(default)]
    pub(crate) store_path: Option<Utf8PathBuf>,
    /// Path to the study index.
    #[arg(long = ARG_STUDIES, value_name = "path")]
    #[serde(default)]
    pub(crate) studies_path: Option<Utf8PathBuf>,
    /// Override the checkpoint path (`<store>.geocode-progress.json`).
    #[arg(long = ARG_CHECKPOINT, value_name = "path")]
    #[serde(default)]
    pub(crate) checkpoint_path: Option<Utf8PathBuf>,
}

impl GeocodeArgs {
    fn into_paths(self) -> Result<GeocodePaths, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        GeocodePaths::try_from(merged)
    }
}

/// Resolved `geocode` command inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeocodePaths {
    pub(crate) config: Utf8PathBuf,
    pub(crate) store: Utf8PathBuf,
    pub(crate) studies: Utf8PathBuf,
    pub(crate) checkpoint: Utf8PathBuf,
}

impl TryFrom<GeocodeArgs> for GeocodePaths {
    type Error = CliError;

    fn try_from(args: GeocodeArgs) -> Result<Self, Self::Error> {
        let config = args.config_path.ok_or(CliError::MissingArgument {
            field: ARG_CONFIG,
            env: ENV_GEOCODE_CONFIG,
        })?;
        let store = args.store_path.ok_or(CliError::MissingArgument {
            field: ARG_STORE,
            env: ENV_GEOCODE_STORE,
        })?;
        let studies = args.studies_path.ok_or(CliError::MissingArgument {
            field: ARG_STUDIES,
            env: ENV_GEOCODE_STUDIES,
        })?;
        let checkpoint = args
            .checkpoint_path
            .unwrap_or_else(|| default_checkpoint(&store));
        Ok(Self {
            config,
            store,
            studies,
            checkpoint,
        })
    }
}

/// Checkpoint kept next to the store.
pub(crate) fn default_checkpoint(store: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{store}{CHECKPOINT_SUFFIX}"))
}

pub(crate) async fn run_geocode(
    args: GeocodeArgs,
    shutdown: impl Future<Output = ()>,
) -> Result<CommandOutcome, CliError> {
    let paths = args.into_paths()?;
    let config = HarvestConfig::load(&paths.config)?;
    let chain = GeocoderChain::from_settings(&config.geocoding, &config.http, config.bounds)?;
    execute_geocode(&chain, &config.geocoding, &paths, shutdown).await
}

/// Run one enrichment pass unless `shutdown` resolves first.
///
/// An interrupted pass writes its checkpoint and leaves the store file
/// untouched.
pub(crate) async fn execute_geocode(
    chain: &GeocoderChain,
    settings: &GeocodingSettings,
    paths: &GeocodePaths,
    shutdown: impl Future<Output = ()>,
) -> Result<CommandOutcome, CliError> {
    if chain.is_empty() {
        return Err(CliError::NoGeocoders);
    }
    let studies = StudyIndex::load(&paths.studies)?;
    let mut store = MergeStore::load(&paths.store)?;
    let checkpoint = RefCell::new(GeocodeCheckpoint::load(&paths.checkpoint)?);
    if checkpoint.borrow().processed_count() > 0 {
        info!(
            "resuming from {} ({} processed, {} resolved)",
            paths.checkpoint,
            checkpoint.borrow().processed_count(),
            checkpoint.borrow().resolved_count()
        );
    }
    info!(
        "{} study locations, {} records in store, {} providers",
        studies.len(),
        store.len(),
        chain.len()
    );

    let pass = EnrichmentPass::new(chain, settings);
    let pass_paths = PassPaths {
        store: &paths.store,
        checkpoint: &paths.checkpoint,
    };
    let outcome = tokio::select! {
        biased;
        () = shutdown => None,
        result = pass.run(&studies, &mut store, pass_paths, &checkpoint) => Some(result),
    };

    let Some(result) = outcome else {
        let progress = checkpoint.borrow();
        progress.save(&paths.checkpoint)?;
        warn!(
            "interrupted; {} processed locations saved to {}",
            progress.processed_count(),
            paths.checkpoint
        );
        return Ok(CommandOutcome::Interrupted);
    };
    let report = result?;
    info!(
        "geocoded {} of {} locations ({} failed, {} skipped from checkpoint)",
        report.resolved, report.attempted, report.failed, report.already_processed
    );
    info!(
        "{} new records; store now holds {}",
        report.merge.inserted,
        store.len()
    );
    Ok(CommandOutcome::Completed)
}
