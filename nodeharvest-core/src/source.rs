//! Static description of a harvested service.

use serde::{Deserialize, Serialize};

use crate::{Category, Origin, fold};

/// Query dialect spoken by a source endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Esri feature/map service layer answering `/query`.
    Arcgis,
    /// Socrata SODA resource answering `$limit`/`$offset` queries.
    Socrata,
}

/// Where a source keeps its positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryMode {
    /// Each element carries a provider geometry object.
    Nested,
    /// Positions live in two scalar latitude/longitude attributes.
    Fields,
}

/// Configuration of one harvested source. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestSourceConfig {
    /// Short source name used in logs and synthetic identifiers.
    pub name: String,
    /// Provenance tag stamped on every record.
    pub origin: Origin,
    /// Query dialect.
    pub kind: SourceKind,
    /// Base query endpoint.
    pub endpoint: String,
    /// Endpoints tried in order when the previous one fails outright.
    #[serde(default)]
    pub alternate_endpoints: Vec<String>,
    /// Overrides where positions are read from.
    #[serde(default)]
    pub geometry: Option<GeometryMode>,
    /// Declared identifier field, tried before the generic candidates.
    #[serde(default)]
    pub id_field: Option<String>,
    /// Declared label field, tried before the generic candidates.
    #[serde(default)]
    pub label_field: Option<String>,
    /// Classification stamped on every record.
    pub category: Category,
    /// Display colour stamped on every record.
    pub color: String,
}

impl HarvestSourceConfig {
    /// Effective geometry mode.
    ///
    /// ArcGIS layers default to nested geometry and Socrata resources to
    /// scalar coordinate fields.
    #[must_use]
    pub fn geometry_mode(&self) -> GeometryMode {
        self.geometry.unwrap_or(match self.kind {
            SourceKind::Arcgis => GeometryMode::Nested,
            SourceKind::Socrata => GeometryMode::Fields,
        })
    }

    /// Primary endpoint followed by the alternates.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.endpoint.as_str())
            .chain(self.alternate_endpoints.iter().map(String::as_str))
    }

    /// Prefix used for synthetic identifiers of coordinate-field sources.
    #[must_use]
    pub fn id_prefix(&self) -> String {
        fold(&self.name)
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() {
                    ch.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}
