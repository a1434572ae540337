//! Turning raw page elements into canonical [`Record`]s.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    BoundingBox, CandidateTable, CanonicalGeometry, FieldResolution, GeometryMode,
    HarvestSourceConfig, Record, Role, normalize_geometry, point_from_lon_lat, resolve_fields,
    value_text,
};

/// One element of a fetched page before normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    /// Flat attribute mapping.
    pub attributes: Map<String, Value>,
    /// Provider geometry payload, if the element carried one.
    pub geometry: Option<Value>,
}

impl RawRecord {
    /// Build a raw record from attributes alone.
    #[must_use]
    pub const fn from_attributes(attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            geometry: None,
        }
    }
}

/// Why a raw element was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionReason {
    /// A coordinate attribute was absent or null.
    MissingCoordinates,
    /// A coordinate was not a finite number.
    NonNumericCoordinates,
    /// A coordinate was exactly zero.
    ZeroCoordinates,
    /// The point fell outside the configured bounding box.
    OutOfBounds,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingCoordinates => "missing coordinates",
            Self::NonNumericCoordinates => "non-numeric coordinates",
            Self::ZeroCoordinates => "zero coordinates",
            Self::OutOfBounds => "outside bounding box",
        };
        f.write_str(text)
    }
}

/// Raised when a coordinate-field source exposes no usable coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("source {source_name} has no resolvable {missing} field")]
pub struct UnusableSource {
    /// Name of the offending source.
    pub source_name: String,
    /// Human-readable list of the unresolved coordinate roles.
    pub missing: String,
}

/// Records accepted from a batch plus rejection counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    /// Accepted records in input order.
    pub records: Vec<Record>,
    /// Number of rejected elements per reason.
    pub rejected: BTreeMap<RejectionReason, usize>,
}

impl NormalizeOutcome {
    /// Total number of rejected elements.
    #[must_use]
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Normaliser bound to one source and one field resolution.
///
/// The resolution is computed once from a sample element and reused for
/// every element of the run.
#[derive(Debug, Clone)]
pub struct RecordNormalizer<'a> {
    source: &'a HarvestSourceConfig,
    bounds: BoundingBox,
    mode: GeometryMode,
    resolution: FieldResolution,
}

impl<'a> RecordNormalizer<'a> {
    /// Resolve fields for `source` from `sample`.
    ///
    /// The source's declared id and label fields are tried before the
    /// generic candidates.
    ///
    /// # Errors
    ///
    /// Returns [`UnusableSource`] when the source stores positions in scalar
    /// fields and either coordinate field cannot be resolved.
    pub fn for_source(
        source: &'a HarvestSourceConfig,
        table: &CandidateTable,
        bounds: BoundingBox,
        sample: &RawRecord,
    ) -> Result<Self, UnusableSource> {
        let table = table
            .clone()
            .with_hint(Role::Identifier, source.id_field.as_deref())
            .with_hint(Role::Label, source.label_field.as_deref());
        let resolution = resolve_fields(&sample.attributes, &table);
        let mode = source.geometry_mode();
        if mode == GeometryMode::Fields && !resolution.has_coordinates() {
            let missing = resolution
                .unresolved()
                .into_iter()
                .filter(|role| matches!(role, Role::Latitude | Role::Longitude))
                .map(|role| match role {
                    Role::Latitude => "latitude",
                    _ => "longitude",
                })
                .collect::<Vec<_>>()
                .join(" and ");
            return Err(UnusableSource {
                source_name: source.name.clone(),
                missing,
            });
        }
        Ok(Self {
            source,
            bounds,
            mode,
            resolution,
        })
    }

    /// Field mapping in use.
    #[must_use]
    pub const fn resolution(&self) -> &FieldResolution {
        &self.resolution
    }

    /// Normalise one element. `position` is its 1-based index in the batch.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] when the element's position is
    /// missing or implausible.
    pub fn normalize(&self, position: usize, raw: RawRecord) -> Result<Record, RejectionReason> {
        let geometry = match self.mode {
            GeometryMode::Fields => Some(self.point_from_fields(&raw.attributes)?),
            GeometryMode::Nested => self.nested_geometry(raw.geometry.as_ref())?,
        };
        let id = self
            .text(&raw.attributes, Role::Identifier)
            .unwrap_or_else(|| self.fallback_id(position));
        let label = self
            .text(&raw.attributes, Role::Label)
            .unwrap_or_else(|| format!("Node {id}"));
        Ok(Record {
            id,
            label,
            geometry,
            origin: self.source.origin.clone(),
            category: self.source.category,
            color: self.source.color.clone(),
            raw_attributes: raw.attributes,
            enrichment: None,
        })
    }

    /// Normalise a whole batch, counting rejections instead of failing.
    #[must_use]
    pub fn normalize_batch(&self, raws: Vec<RawRecord>) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::default();
        for (index, raw) in raws.into_iter().enumerate() {
            match self.normalize(index + 1, raw) {
                Ok(record) => outcome.records.push(record),
                Err(reason) => *outcome.rejected.entry(reason).or_insert(0) += 1,
            }
        }
        outcome
    }

    fn text(&self, attributes: &Map<String, Value>, role: Role) -> Option<String> {
        self.resolution
            .field(role)
            .and_then(|field| attributes.get(field))
            .and_then(value_text)
    }

    fn fallback_id(&self, position: usize) -> String {
        match self.mode {
            GeometryMode::Nested => format!("ID_{position}"),
            GeometryMode::Fields => format!("{}_{position}", self.source.id_prefix()),
        }
    }

    fn point_from_fields(
        &self,
        attributes: &Map<String, Value>,
    ) -> Result<CanonicalGeometry, RejectionReason> {
        let latitude = self.coordinate(attributes, Role::Latitude)?;
        let longitude = self.coordinate(attributes, Role::Longitude)?;
        let coord = self.bounds.validate(longitude, latitude)?;
        Ok(point_from_lon_lat(coord.x, coord.y))
    }

    fn coordinate(&self, attributes: &Map<String, Value>, role: Role) -> Result<f64, RejectionReason> {
        let value = self
            .resolution
            .field(role)
            .and_then(|field| attributes.get(field))
            .ok_or(RejectionReason::MissingCoordinates)?;
        match value {
            Value::Null => Err(RejectionReason::MissingCoordinates),
            Value::Number(number) => number
                .as_f64()
                .ok_or(RejectionReason::NonNumericCoordinates),
            Value::String(text) if text.trim().is_empty() => {
                Err(RejectionReason::MissingCoordinates)
            }
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| RejectionReason::NonNumericCoordinates),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                Err(RejectionReason::NonNumericCoordinates)
            }
        }
    }

    fn nested_geometry(
        &self,
        payload: Option<&Value>,
    ) -> Result<Option<CanonicalGeometry>, RejectionReason> {
        let Some(geometry) = payload.and_then(normalize_geometry) else {
            return Ok(None);
        };
        if let Some(point) = geometry.as_point() {
            self.bounds.validate(point.x(), point.y())?;
        }
        Ok(Some(geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, Origin, SourceKind};
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[fixture]
    fn arcgis_source() -> HarvestSourceConfig {
        HarvestSourceConfig {
            name: "semaforos".to_owned(),
            origin: Origin::new("SDM_SEMAFOROS"),
            kind: SourceKind::Arcgis,
            endpoint: "https://example.test/FeatureServer/0".to_owned(),
            alternate_endpoints: Vec::new(),
            geometry: None,
            id_field: Some("CODIGO".to_owned()),
            label_field: None,
            category: Category::Infrastructure,
            color: "#00C853".to_owned(),
        }
    }

    #[fixture]
    fn socrata_source() -> HarvestSourceConfig {
        HarvestSourceConfig {
            name: "aforos".to_owned(),
            origin: Origin::new("SOCRATA_AFOROS"),
            kind: SourceKind::Socrata,
            endpoint: "https://example.test/resource/abcd.json".to_owned(),
            alternate_endpoints: Vec::new(),
            geometry: None,
            id_field: None,
            label_field: None,
            category: Category::AutomaticSensor,
            color: "#FF9100".to_owned(),
        }
    }

    fn socrata_sample() -> RawRecord {
        RawRecord::from_attributes(attributes(json!({
            "latitud": "4.65",
            "longitud": "-74.08",
            "direccion": "Calle 26 con Carrera 7",
        })))
    }

    #[rstest]
    fn nested_point_keeps_provenance(arcgis_source: HarvestSourceConfig) {
        let raw = RawRecord {
            attributes: attributes(json!({ "CODIGO": 1207, "INTERSECCION": "AK 7 X CL 26" })),
            geometry: Some(json!({ "x": -74.08, "y": 4.65 })),
        };
        let normalizer = RecordNormalizer::for_source(
            &arcgis_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &raw,
        )
        .expect("usable source");
        let record = normalizer.normalize(1, raw).expect("accepted");
        assert_eq!(record.id, "1207");
        assert_eq!(record.label, "AK 7 X CL 26");
        assert_eq!(record.geometry, Some(point_from_lon_lat(-74.08, 4.65)));
        assert_eq!(record.origin, Origin::new("SDM_SEMAFOROS"));
        assert_eq!(record.category, Category::Infrastructure);
        assert_eq!(record.raw_attributes.get("CODIGO"), Some(&json!(1207)));
    }

    #[rstest]
    fn nested_source_keeps_null_geometry_and_synthesises_names(
        arcgis_source: HarvestSourceConfig,
    ) {
        let raw = RawRecord::from_attributes(attributes(json!({ "estado": "activo" })));
        let normalizer = RecordNormalizer::for_source(
            &arcgis_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &raw,
        )
        .expect("usable source");
        let record = normalizer.normalize(4, raw).expect("accepted");
        assert_eq!(record.id, "ID_4");
        assert_eq!(record.label, "Node ID_4");
        assert_eq!(record.geometry, None);
    }

    #[rstest]
    fn coordinate_source_builds_points(socrata_source: HarvestSourceConfig) {
        let sample = socrata_sample();
        let normalizer = RecordNormalizer::for_source(
            &socrata_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &sample,
        )
        .expect("usable source");
        let record = normalizer.normalize(3, sample).expect("accepted");
        assert_eq!(record.id, "AFOROS_3");
        assert_eq!(record.label, "Calle 26 con Carrera 7");
        assert_eq!(record.geometry, Some(point_from_lon_lat(-74.08, 4.65)));
    }

    #[rstest]
    #[case::zero(json!({ "latitud": 0, "longitud": 0 }), RejectionReason::ZeroCoordinates)]
    #[case::north(json!({ "latitud": 10.5, "longitud": -74.08 }), RejectionReason::OutOfBounds)]
    #[case::text(json!({ "latitud": "n/a", "longitud": -74.08 }), RejectionReason::NonNumericCoordinates)]
    #[case::null(json!({ "latitud": null, "longitud": -74.08 }), RejectionReason::MissingCoordinates)]
    #[case::absent(json!({ "longitud": -74.08 }), RejectionReason::MissingCoordinates)]
    fn coordinate_source_rejects_implausible_points(
        socrata_source: HarvestSourceConfig,
        #[case] payload: Value,
        #[case] expected: RejectionReason,
    ) {
        let normalizer = RecordNormalizer::for_source(
            &socrata_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &socrata_sample(),
        )
        .expect("usable source");
        let rejected = normalizer
            .normalize(1, RawRecord::from_attributes(attributes(payload)))
            .expect_err("should reject");
        assert_eq!(rejected, expected);
    }

    #[rstest]
    fn nested_points_outside_bounds_are_rejected(arcgis_source: HarvestSourceConfig) {
        let raw = RawRecord {
            attributes: attributes(json!({ "CODIGO": "X" })),
            geometry: Some(json!({ "x": 0.0, "y": 0.0 })),
        };
        let normalizer = RecordNormalizer::for_source(
            &arcgis_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &raw,
        )
        .expect("usable source");
        assert_eq!(
            normalizer.normalize(1, raw),
            Err(RejectionReason::ZeroCoordinates)
        );
    }

    #[rstest]
    fn coordinate_source_without_coordinates_is_unusable(socrata_source: HarvestSourceConfig) {
        let sample = RawRecord::from_attributes(attributes(json!({ "nombre": "sin posicion" })));
        let err = RecordNormalizer::for_source(
            &socrata_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &sample,
        )
        .expect_err("unusable");
        assert_eq!(err.source_name, "aforos");
        assert_eq!(err.missing, "latitude and longitude");
    }

    #[rstest]
    fn batch_counts_rejections(socrata_source: HarvestSourceConfig) {
        let batch = vec![
            socrata_sample(),
            RawRecord::from_attributes(attributes(json!({ "latitud": 0, "longitud": 0 }))),
            RawRecord::from_attributes(attributes(json!({ "latitud": 10.5, "longitud": -74.0 }))),
        ];
        let normalizer = RecordNormalizer::for_source(
            &socrata_source,
            &CandidateTable::default(),
            BoundingBox::default(),
            &socrata_sample(),
        )
        .expect("usable source");
        let outcome = normalizer.normalize_batch(batch);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rejected_total(), 2);
        assert_eq!(
            outcome.rejected.get(&RejectionReason::OutOfBounds),
            Some(&1)
        );
    }
}
