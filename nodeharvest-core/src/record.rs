//! Canonical record model shared by every stage of the harvest.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CanonicalGeometry;

/// Name of the system a record was harvested from.
///
/// Origins drive provenance reporting and selective retraction through
/// [`MergeStore::filter_origins`](crate::MergeStore::filter_origins).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// Wrap an origin name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the origin name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Origin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Coarse classification assigned per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Fixed traffic infrastructure such as signalised intersections.
    Infrastructure,
    /// Sites counted by hand during traffic studies.
    ManualSurvey,
    /// Permanent vehicle-counting sensors.
    AutomaticSensor,
}

/// A harvested record after normalisation.
///
/// Coordinates inside [`geometry`](Self::geometry) are always
/// longitude-then-latitude. The raw attribute map is kept verbatim for
/// later inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identifier unique across the merged collection.
    pub id: String,
    /// Human-readable location description.
    pub label: String,
    /// Canonical geometry, absent when the source supplied none.
    pub geometry: Option<CanonicalGeometry>,
    /// Source system that produced the record.
    pub origin: Origin,
    /// Classification inherited from the source configuration.
    pub category: Category,
    /// Display colour inherited from the source configuration.
    pub color: String,
    /// Original attribute payload.
    pub raw_attributes: Map<String, Value>,
    /// Enrichment attributes, set only for geocoded records.
    pub enrichment: Option<Enrichment>,
}

/// Attributes attached by the geocoding pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Confidence score reported or assumed for the accepted candidate.
    pub geocode_score: f64,
    /// Address text returned by the provider.
    pub geocoded_address: String,
    /// Number of studies recorded for the location.
    pub study_count: usize,
}

/// Render an attribute value as record text.
///
/// Strings are trimmed, numbers use their JSON notation and booleans their
/// literal. Empty strings, nulls, arrays and objects yield `None`.
///
/// # Examples
///
/// ```
/// use nodeharvest_core::value_text;
/// use serde_json::json;
///
/// assert_eq!(value_text(&json!("  N-12 ")), Some("N-12".to_owned()));
/// assert_eq!(value_text(&json!(42)), Some("42".to_owned()));
/// assert_eq!(value_text(&json!("")), None);
/// ```
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
