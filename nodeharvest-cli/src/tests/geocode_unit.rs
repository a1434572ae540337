//! Tests for the geocode command driving stubbed providers.

use std::time::Duration;

use super::helpers::{Workspace, load_store};
use super::*;
use crate::geocode::{GeocodePaths, execute_geocode};
use nodeharvest_core::BoundingBox;
use nodeharvest_data::enrich::test_support::{StubGeocoder, bogota_candidate};
use nodeharvest_data::enrich::{GeocodeCheckpoint, GeocoderChain, GeocodingSettings};
use nodeharvest_data::fetch::test_support::block_on_for_tests;
use rstest::{fixture, rstest};

const STUDIES: &str = r#"{
  "nodes": {
    "100": { "address": "CL_26_X_KR_68", "studies": [ { "year": 2019 } ] },
    "200": { "address": "AK_30_X_CL_53", "studies": [ { "year": 2020 }, { "year": 2021 } ] }
  }
}"#;

struct GeocodeFixture {
    _workspace: Workspace,
    paths: GeocodePaths,
}

#[fixture]
fn staged() -> GeocodeFixture {
    let workspace = Workspace::new();
    let paths = GeocodePaths {
        config: workspace.path("harvest.json"),
        store: workspace.path("nodes.geojson"),
        studies: workspace.path("studies.json"),
        checkpoint: workspace.path("nodes.geojson.geocode-progress.json"),
    };
    std::fs::write(paths.studies.as_std_path(), STUDIES).expect("write studies");
    GeocodeFixture {
        _workspace: workspace,
        paths,
    }
}

fn answering_chain() -> GeocoderChain {
    GeocoderChain::new(BoundingBox::default()).with_provider(
        Box::new(StubGeocoder::answering("stub", bogota_candidate(95.0))),
        70.0,
    )
}

fn settings(request_delay_ms: u64) -> GeocodingSettings {
    GeocodingSettings {
        request_delay_ms,
        ..GeocodingSettings::default()
    }
}

#[rstest]
fn completed_pass_writes_store_and_drops_checkpoint(staged: GeocodeFixture) {
    let chain = answering_chain();
    let outcome = block_on_for_tests(execute_geocode(
        &chain,
        &settings(0),
        &staged.paths,
        std::future::pending(),
    ))
    .expect("geocode runs");

    assert_eq!(outcome, CommandOutcome::Completed);
    let store = load_store(&staged.paths.store);
    assert_eq!(store.len(), 2);
    let record = store.get("200").expect("geocoded record");
    assert_eq!(
        record.enrichment.as_ref().map(|enrichment| enrichment.study_count),
        Some(2)
    );
    assert!(!staged.paths.checkpoint.exists());
}

#[rstest]
fn interrupted_pass_flushes_checkpoint(staged: GeocodeFixture) {
    let chain = answering_chain();
    let outcome = block_on_for_tests(async {
        execute_geocode(
            &chain,
            &settings(60_000),
            &staged.paths,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
    })
    .expect("geocode runs");

    assert_eq!(outcome, CommandOutcome::Interrupted);
    assert!(!staged.paths.store.exists());
    let checkpoint = GeocodeCheckpoint::load(&staged.paths.checkpoint).expect("checkpoint");
    assert_eq!(checkpoint.processed_count(), 1);
    assert_eq!(checkpoint.resolved_count(), 1);
}

#[rstest]
fn resumed_pass_skips_checkpointed_locations(staged: GeocodeFixture) {
    let mut progress = GeocodeCheckpoint::default();
    progress.mark_failed("100");
    progress.save(&staged.paths.checkpoint).expect("seed checkpoint");
    let geocoder = StubGeocoder::answering("stub", bogota_candidate(95.0));
    let calls = geocoder.calls();
    let chain = GeocoderChain::new(BoundingBox::default()).with_provider(Box::new(geocoder), 70.0);

    let outcome = block_on_for_tests(execute_geocode(
        &chain,
        &settings(0),
        &staged.paths,
        std::future::pending(),
    ))
    .expect("geocode runs");

    assert_eq!(outcome, CommandOutcome::Completed);
    assert_eq!(calls.get(), 1);
    let store = load_store(&staged.paths.store);
    assert!(store.contains("200"));
    assert!(!store.contains("100"));
}

#[rstest]
fn empty_chain_is_a_configuration_error(staged: GeocodeFixture) {
    let chain = GeocoderChain::new(BoundingBox::default());
    let err = block_on_for_tests(execute_geocode(
        &chain,
        &settings(0),
        &staged.paths,
        std::future::pending(),
    ))
    .expect_err("no providers");
    assert!(matches!(err, CliError::NoGeocoders));
}

#[rstest]
fn missing_study_index_is_reported(staged: GeocodeFixture) {
    std::fs::remove_file(staged.paths.studies.as_std_path()).expect("remove studies");
    let err = block_on_for_tests(execute_geocode(
        &answering_chain(),
        &settings(0),
        &staged.paths,
        std::future::pending(),
    ))
    .expect_err("studies are required");
    assert!(matches!(err, CliError::StudyIndex(_)));
}
