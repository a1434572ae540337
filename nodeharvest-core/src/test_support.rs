//! Builders shared by tests across the workspace.

use serde_json::Map;

use crate::{Category, HarvestSourceConfig, Origin, Record, SourceKind, point_from_lon_lat};

/// Build a point record with the given id and origin.
#[must_use]
pub fn point_record(id: &str, origin: &str, longitude: f64, latitude: f64) -> Record {
    Record {
        id: id.to_owned(),
        label: format!("Node {id}"),
        geometry: Some(point_from_lon_lat(longitude, latitude)),
        origin: Origin::new(origin),
        category: Category::Infrastructure,
        color: "#00C853".to_owned(),
        raw_attributes: Map::new(),
        enrichment: None,
    }
}

/// Build a source configuration of `kind` pointing at `endpoint`.
#[must_use]
pub fn source_config(name: &str, kind: SourceKind, endpoint: &str) -> HarvestSourceConfig {
    HarvestSourceConfig {
        name: name.to_owned(),
        origin: Origin::new(name.to_uppercase()),
        kind,
        endpoint: endpoint.to_owned(),
        alternate_endpoints: Vec::new(),
        geometry: None,
        id_field: None,
        label_field: None,
        category: match kind {
            SourceKind::Arcgis => Category::Infrastructure,
            SourceKind::Socrata => Category::AutomaticSensor,
        },
        color: "#00C853".to_owned(),
    }
}
