//! Shared test harness modules for the CLI.

use super::*;

mod geocode_unit;
mod harvest_steps;
mod helpers;
