//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use nodeharvest_cli::{CliError, run};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    if let Err(err) = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("nodeharvest: cannot install logger: {err}");
    }

    match run() {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("nodeharvest: {err}");
            std::process::exit(1);
        }
    }
}
