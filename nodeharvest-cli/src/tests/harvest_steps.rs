//! Behaviour-driven step definitions driving the harvest command scenarios.

use super::helpers::{Workspace, load_store, write_store};
use super::*;
use crate::harvest::execute_harvest;
use camino::Utf8PathBuf;
use nodeharvest_core::test_support::source_config;
use nodeharvest_core::{Origin, SourceKind};
use nodeharvest_data::HarvestConfig;
use nodeharvest_data::fetch::test_support::{block_on_for_tests, esri_points};
use nodeharvest_data::harvest::test_support::{StubConnector, StubEndpoint};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::{Cell, RefCell};

/// Aggregates harvest command scenario state behind a single world fixture.
struct HarvestCommandWorld {
    workspace: Workspace,
    store_path: Utf8PathBuf,
    config: RefCell<HarvestConfig>,
    connector: RefCell<StubConnector>,
    interrupt: Cell<bool>,
    result: RefCell<Option<Result<CommandOutcome, CliError>>>,
}

impl HarvestCommandWorld {
    fn new() -> Self {
        let workspace = Workspace::new();
        let store_path = workspace.path("nodes.geojson");
        Self {
            workspace,
            store_path,
            config: RefCell::new(HarvestConfig {
                page_delay_ms: 0,
                ..HarvestConfig::default()
            }),
            connector: RefCell::new(StubConnector::new()),
            interrupt: Cell::new(false),
            result: RefCell::new(None),
        }
    }

    fn add_source(&self, name: &str, behaviour: StubEndpoint) {
        let endpoint = format!("https://{name}.example.test/arcgis/rest/services/0");
        let connector = self.connector.take();
        self.connector.replace(connector.with_endpoint(&endpoint, behaviour));
        self.config
            .borrow_mut()
            .sources
            .push(source_config(name, SourceKind::Arcgis, &endpoint));
    }
}

#[fixture]
fn world() -> HarvestCommandWorld {
    HarvestCommandWorld::new()
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches('"')
}

#[given("a source {name} serving {count} records")]
fn serving_source(#[from(world)] world: &HarvestCommandWorld, name: String, count: usize) {
    world.add_source(unquote(&name), StubEndpoint::Records(esri_points(count, 1)));
}

#[given("a source {name} whose endpoint is unreachable")]
fn unreachable_source(#[from(world)] world: &HarvestCommandWorld, name: String) {
    world.add_source(unquote(&name), StubEndpoint::Unreachable);
}

#[given("the run is interrupted immediately")]
fn interrupted(#[from(world)] world: &HarvestCommandWorld) {
    world.interrupt.set(true);
}

#[given("the store file already holds record {id} from {origin}")]
fn existing_store(#[from(world)] world: &HarvestCommandWorld, id: String, origin: String) {
    write_store(&world.store_path, &[(unquote(&id), unquote(&origin))]);
}

#[when("I run the harvest command")]
fn run_harvest_command(#[from(world)] world: &HarvestCommandWorld) {
    let config = world.config.borrow();
    let connector = world.connector.borrow();
    let outcome = block_on_for_tests(async {
        if world.interrupt.get() {
            execute_harvest(&config, &world.store_path, &*connector, std::future::ready(())).await
        } else {
            execute_harvest(&config, &world.store_path, &*connector, std::future::pending()).await
        }
    });
    world.result.replace(Some(outcome));
}

#[then("the command completes")]
fn command_completes(#[from(world)] world: &HarvestCommandWorld) {
    let borrowed = world.result.borrow();
    let outcome = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    assert_eq!(*outcome, CommandOutcome::Completed);
}

#[then("the command reports an interruption")]
fn command_interrupted(#[from(world)] world: &HarvestCommandWorld) {
    let borrowed = world.result.borrow();
    let outcome = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    assert_eq!(*outcome, CommandOutcome::Interrupted);
}

#[then("the command fails because no source succeeded")]
fn command_fails(#[from(world)] world: &HarvestCommandWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    assert!(
        matches!(error, CliError::NoSourceSucceeded { attempted: 1 }),
        "unexpected error {error:?}"
    );
}

#[then("the store file holds {count} records")]
fn store_file_holds(#[from(world)] world: &HarvestCommandWorld, count: usize) {
    assert_eq!(load_store(&world.store_path).len(), count);
}

#[then("no store file is written")]
fn no_store_file(#[from(world)] world: &HarvestCommandWorld) {
    assert!(!world.store_path.exists());
    assert!(!world.workspace.path(".nodes.geojson.partial").exists());
}

#[then("record {id} still comes from {origin}")]
fn record_origin(#[from(world)] world: &HarvestCommandWorld, id: String, origin: String) {
    let store = load_store(&world.store_path);
    let record = store.get(unquote(&id)).expect("record present");
    assert_eq!(record.origin, Origin::from(unquote(&origin)));
}

#[scenario(path = "tests/features/harvest_command.feature", index = 0)]
fn failing_source_does_not_sink_run(world: HarvestCommandWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/harvest_command.feature", index = 1)]
fn every_source_failing(world: HarvestCommandWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/harvest_command.feature", index = 2)]
fn interrupting_a_harvest(world: HarvestCommandWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/harvest_command.feature", index = 3)]
fn keeping_earlier_records(world: HarvestCommandWorld) {
    let _ = world;
}
