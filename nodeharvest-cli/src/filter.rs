//! Filter command implementation.

use std::collections::BTreeSet;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use nodeharvest_core::{FilterOutcome, MergeStore, Origin};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_KEEP, ARG_STORE, CliError, CommandOutcome, ENV_FILTER_KEEP, ENV_FILTER_STORE};

/// CLI arguments for the `filter` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Remove every record whose origin is not listed with \
                 --keep and rewrite the store.",
    about = "Retract unwanted origins from the store"
)]
#[ortho_config(prefix = "NODEHARVEST")]
pub(crate) struct FilterArgs {
    /// Path to the GeoJSON store.
    #[arg(long = ARG_STORE, value_name = "path")]
    #[serde(default)]
    pub(crate) store_path: Option<Utf8PathBuf>,
    /// Origin to keep; repeat for several.
    #[arg(long = ARG_KEEP, value_name = "origin")]
    #[serde(default)]
    pub(crate) keep: Vec<String>,
}

impl FilterArgs {
    fn into_config(self) -> Result<FilterConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FilterConfig::try_from(merged)
    }
}

/// Resolved `filter` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FilterConfig {
    pub(crate) store: Utf8PathBuf,
    pub(crate) keep: BTreeSet<Origin>,
}

impl TryFrom<FilterArgs> for FilterConfig {
    type Error = CliError;

    fn try_from(args: FilterArgs) -> Result<Self, Self::Error> {
        let store = args.store_path.ok_or(CliError::MissingArgument {
            field: ARG_STORE,
            env: ENV_FILTER_STORE,
        })?;
        let keep: BTreeSet<Origin> = args
            .keep
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(Origin::from)
            .collect();
        if keep.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_KEEP,
                env: ENV_FILTER_KEEP,
            });
        }
        Ok(Self { store, keep })
    }
}

pub(crate) fn run_filter(args: FilterArgs) -> Result<CommandOutcome, CliError> {
    let config = args.into_config()?;
    execute_filter(&config)?;
    Ok(CommandOutcome::Completed)
}

/// Retract the unlisted origins and rewrite the store.
pub(crate) fn execute_filter(config: &FilterConfig) -> Result<FilterOutcome, CliError> {
    let mut store = MergeStore::load(&config.store)?;
    let outcome = store.filter_origins(&config.keep);
    for (origin, count) in &outcome.removed {
        info!("removed {count} records from {origin}");
    }
    store.persist(&config.store)?;
    info!(
        "kept {} records, removed {}; wrote {}",
        outcome.kept,
        outcome.removed_total(),
        config.store
    );
    Ok(outcome)
}
