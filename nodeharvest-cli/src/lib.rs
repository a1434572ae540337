//! Command-line interface for the traffic-node harvest.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use std::future::Future;

mod error;
mod filter;
mod geocode;
mod harvest;

pub use error::CliError;

use filter::FilterArgs;
use geocode::GeocodeArgs;
use harvest::HarvestArgs;

pub(crate) const ARG_CONFIG: &str = "config";
pub(crate) const ARG_STORE: &str = "store";
pub(crate) const ARG_STUDIES: &str = "studies";
pub(crate) const ARG_CHECKPOINT: &str = "checkpoint";
pub(crate) const ARG_KEEP: &str = "keep";
pub(crate) const ENV_HARVEST_CONFIG: &str = "NODEHARVEST_CMDS_HARVEST_CONFIG_PATH";
pub(crate) const ENV_HARVEST_STORE: &str = "NODEHARVEST_CMDS_HARVEST_STORE_PATH";
pub(crate) const ENV_GEOCODE_CONFIG: &str = "NODEHARVEST_CMDS_GEOCODE_CONFIG_PATH";
pub(crate) const ENV_GEOCODE_STORE: &str = "NODEHARVEST_CMDS_GEOCODE_STORE_PATH";
pub(crate) const ENV_GEOCODE_STUDIES: &str = "NODEHARVEST_CMDS_GEOCODE_STUDIES_PATH";
pub(crate) const ENV_FILTER_STORE: &str = "NODEHARVEST_CMDS_FILTER_STORE_PATH";
pub(crate) const ENV_FILTER_KEEP: &str = "NODEHARVEST_CMDS_FILTER_KEEP";

/// How a command finished when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran to completion.
    Completed,
    /// The user interrupted the command with Ctrl-C.
    Interrupted,
}

impl CommandOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Interrupted => 130,
        }
    }
}

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments, configuration or any input is
/// invalid, when a file cannot be written, or when no harvest source
/// succeeded.
pub fn run() -> Result<CommandOutcome, CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    match cli.command {
        Command::Harvest(args) => runtime.block_on(harvest::run_harvest(args, ctrl_c())),
        Command::Geocode(args) => runtime.block_on(geocode::run_geocode(args, ctrl_c())),
        Command::Filter(args) => filter::run_filter(args),
    }
}

/// Resolves when the user presses Ctrl-C.
///
/// Never resolves when the signal handler cannot be installed.
fn ctrl_c() -> impl Future<Output = ()> {
    async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("cannot listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "nodeharvest",
    about = "Harvest, geocode and curate traffic-node records",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Harvest every configured source into the store.
    Harvest(HarvestArgs),
    /// Geocode study locations missing from the store.
    Geocode(GeocodeArgs),
    /// Retract every origin that is not kept.
    Filter(FilterArgs),
}

#[cfg(test)]
mod tests;
