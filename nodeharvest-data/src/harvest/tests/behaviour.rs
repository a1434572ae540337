//! Behavioural coverage for harvesting a single source.

use std::cell::RefCell;

use nodeharvest_core::test_support::source_config;
use nodeharvest_core::{
    BoundingBox, CandidateTable, HarvestSourceConfig, MergeStore, RawRecord, SourceKind,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Map, json};

use crate::fetch::test_support::{block_on_for_tests, esri_points};
use crate::fetch::{Page, PaginationOptions};
use crate::harvest::test_support::{StubConnector, StubEndpoint};
use crate::harvest::{Harvester, SourceReport};

const LAYER: &str = "https://sig.example.test/arcgis/rest/services/Nodos/FeatureServer/0";

#[derive(Default)]
struct HarvestWorld {
    connector: RefCell<Option<StubConnector>>,
    source: RefCell<Option<HarvestSourceConfig>>,
    store: RefCell<MergeStore>,
    report: RefCell<Option<SourceReport>>,
}

#[fixture]
fn world() -> HarvestWorld {
    HarvestWorld::default()
}

fn row(code: &str, latitude: f64, longitude: f64) -> RawRecord {
    let mut attributes = Map::new();
    attributes.insert("codigo_nodo".to_owned(), json!(code));
    attributes.insert("latitud".to_owned(), json!(latitude));
    attributes.insert("longitud".to_owned(), json!(longitude));
    RawRecord::from_attributes(attributes)
}

fn install(world: &HarvestWorld, source: HarvestSourceConfig, endpoint: StubEndpoint) {
    world.connector.replace(Some(
        StubConnector::new().with_endpoint(&source.endpoint, endpoint),
    ));
    world.source.replace(Some(source));
}

#[given("a layer serving {total} records in pages of {size} with the exceeded flag")]
fn flagged_layer(#[from(world)] world: &HarvestWorld, total: usize, size: usize) {
    let records = esri_points(total, 1);
    let pages = records
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| {
            let remaining = (index + 1) * size < total;
            Page::new(chunk.to_vec()).with_exceeded_limit(remaining)
        })
        .collect();
    install(
        world,
        source_config("nodos", SourceKind::Arcgis, LAYER),
        StubEndpoint::Pages(pages),
    );
}

#[given("a layer of {total} records that fails at offset {offset}")]
fn failing_layer(#[from(world)] world: &HarvestWorld, total: usize, offset: usize) {
    install(
        world,
        source_config("nodos", SourceKind::Arcgis, LAYER),
        StubEndpoint::FailingAt {
            records: esri_points(total, 1),
            offset,
        },
    );
}

#[given("a coordinate source with a valid row, a row at zero and a row at latitude 10.5")]
fn coordinate_source(#[from(world)] world: &HarvestWorld) {
    let endpoint = "https://www.datos.gov.co/resource/abcd-1234.json";
    install(
        world,
        source_config("aforos", SourceKind::Socrata, endpoint),
        StubEndpoint::Records(vec![
            row("N-1", 4.65, -74.08),
            row("N-2", 0.0, 0.0),
            row("N-3", 10.5, -74.08),
        ]),
    );
}

#[when("I harvest the layer with page size {size}")]
fn harvest_layer(#[from(world)] world: &HarvestWorld, size: usize) {
    let connector = world.connector.borrow();
    let connector = connector.as_ref().expect("connector configured");
    let source = world.source.borrow();
    let source = source.as_ref().expect("source configured");
    let harvester = Harvester::new(
        connector,
        PaginationOptions::new(size),
        BoundingBox::default(),
        CandidateTable::default(),
    );
    let mut store = world.store.borrow_mut();
    let report = block_on_for_tests(harvester.harvest_source(source, &mut store));
    world.report.replace(Some(report));
}

#[then("{fetched} records were fetched in {requests} requests")]
fn fetched_in(#[from(world)] world: &HarvestWorld, fetched: usize, requests: usize) {
    let report = world.report.borrow();
    let report = report.as_ref().expect("report recorded");
    assert_eq!(report.fetched, fetched);
    assert_eq!(report.requests, requests);
}

#[then("the store holds {count} records")]
fn store_holds(#[from(world)] world: &HarvestWorld, count: usize) {
    assert_eq!(world.store.borrow().len(), count);
}

#[then("the report records the fetch error")]
fn report_error(#[from(world)] world: &HarvestWorld) {
    let report = world.report.borrow();
    let report = report.as_ref().expect("report recorded");
    assert!(report.error.is_some());
    assert!(report.succeeded(), "partial results still count");
}

#[then("{count} record is accepted")]
fn accepted(#[from(world)] world: &HarvestWorld, count: usize) {
    let report = world.report.borrow();
    assert_eq!(report.as_ref().expect("report recorded").accepted, count);
}

#[then("{count} records were rejected")]
fn rejected(#[from(world)] world: &HarvestWorld, count: usize) {
    let report = world.report.borrow();
    assert_eq!(report.as_ref().expect("report recorded").rejected_total(), count);
}

#[scenario(path = "tests/features/harvest_sources.feature", index = 0)]
fn paging_through_flagged_layer(world: HarvestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/harvest_sources.feature", index = 1)]
fn keeping_pages_before_failure(world: HarvestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/harvest_sources.feature", index = 2)]
fn rejecting_implausible_coordinates(world: HarvestWorld) {
    let _ = world;
}
