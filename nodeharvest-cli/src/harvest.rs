//! Harvest command implementation.

use std::cell::RefCell;
use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{info, warn};
use nodeharvest_core::{MergeOutcome, MergeStore};
use nodeharvest_data::{HarvestConfig, Harvester, HttpConnector, SourceConnector, SourceReport};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CONFIG, ARG_STORE, CliError, CommandOutcome, ENV_HARVEST_CONFIG, ENV_HARVEST_STORE,
};

/// CLI arguments for the `harvest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Page through every configured source, normalise the \
                 records and merge them into the store. Records already in \
                 the store are never overwritten.",
    about = "Harvest all configured sources"
)]
#[ortho_config(prefix = "NODEHARVEST")]
pub(crate) struct HarvestArgs {
    /// Path to the JSON harvest configuration.
    #[arg(long = ARG_CONFIG, value_name = "path")]
    #[serde(default)]
    pub(crate) config_path: Option<Utf8PathBuf>,
    /// Path to the GeoJSON store.
    #[arg(long = ARG_STORE, value_name = "path")]
    #[serde(default)]
    pub(crate) store_path: Option<Utf8PathBuf>,
}

impl HarvestArgs {
    fn into_paths(self) -> Result<HarvestPaths, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        HarvestPaths::try_from(merged)
    }
}

/// Resolved `harvest` command inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HarvestPaths {
    pub(crate) config: Utf8PathBuf,
    pub(crate) store: Utf8PathBuf,
}

impl TryFrom<HarvestArgs> for HarvestPaths {
    type Error = CliError;

    fn try_from(args: HarvestArgs) -> Result<Self, Self::Error> {
        let config = args.config_path.ok_or(CliError::MissingArgument {
            field: ARG_CONFIG,
            env: ENV_HARVEST_CONFIG,
        })?;
        let store = args.store_path.ok_or(CliError::MissingArgument {
            field: ARG_STORE,
            env: ENV_HARVEST_STORE,
        })?;
        Ok(Self { config, store })
    }
}

pub(crate) async fn run_harvest(
    args: HarvestArgs,
    shutdown: impl Future<Output = ()>,
) -> Result<CommandOutcome, CliError> {
    let paths = args.into_paths()?;
    let config = HarvestConfig::load(&paths.config)?;
    config.validate_for_harvest()?;
    let connector = HttpConnector::new(&config.http)?;
    execute_harvest(&config, &paths.store, &connector, shutdown).await
}

/// Harvest into the store at `store_path` unless `shutdown` resolves first.
///
/// An interrupted run logs the completed reports and leaves the store file
/// untouched.
pub(crate) async fn execute_harvest<C>(
    config: &HarvestConfig,
    store_path: &Utf8Path,
    connector: &C,
    shutdown: impl Future<Output = ()>,
) -> Result<CommandOutcome, CliError>
where
    C: SourceConnector + ?Sized,
{
    let mut store = MergeStore::load(store_path)?;
    info!("loaded {} records from {store_path}", store.len());
    let harvester = Harvester::from_config(connector, config);
    let progress = RefCell::new(Vec::new());

    let interrupted = tokio::select! {
        biased;
        () = shutdown => true,
        () = harvester.harvest_all(&config.sources, &mut store, &progress) => false,
    };

    let reports = progress.into_inner();
    log_summary(&reports);
    if interrupted {
        warn!(
            "interrupted after {} of {} sources; {store_path} not written",
            reports.len(),
            config.sources.len()
        );
        return Ok(CommandOutcome::Interrupted);
    }
    if !reports.iter().any(SourceReport::succeeded) {
        return Err(CliError::NoSourceSucceeded {
            attempted: reports.len(),
        });
    }

    store.persist(store_path)?;
    for (origin, count) in store.counts_by_origin() {
        info!("  {origin}: {count}");
    }
    info!("wrote {} records to {store_path}", store.len());
    Ok(CommandOutcome::Completed)
}

fn log_summary(reports: &[SourceReport]) {
    let merged = reports
        .iter()
        .fold(MergeOutcome::default(), |total, report| total.add(report.merge));
    let failed = reports.iter().filter(|report| !report.succeeded()).count();
    info!(
        "{} sources harvested ({failed} failed): {} new records, {} duplicates",
        reports.len(),
        merged.inserted,
        merged.duplicates
    );
    for report in reports.iter().filter(|report| !report.succeeded()) {
        warn!("{report}");
    }
}
