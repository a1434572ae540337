//! Conversion of provider geometry payloads into canonical geometries.
//!
//! Remote services encode shapes in their own dialects: Esri feature
//! services return `{x, y}` points, `{paths}` polylines and `{rings}`
//! polygons. [`normalize_geometry`] folds those into a
//! [`CanonicalGeometry`], which serialises as a GeoJSON geometry object
//! with coordinates in longitude-then-latitude order.
//!
//! # Examples
//!
//! ```
//! use nodeharvest_core::{CanonicalGeometry, normalize_geometry};
//! use serde_json::json;
//!
//! let geometry = normalize_geometry(&json!({ "x": -74.08, "y": 4.65 }))
//!     .expect("point geometry");
//! assert_eq!(
//!     serde_json::to_value(&geometry).expect("serialise"),
//!     json!({ "type": "Point", "coordinates": [-74.08, 4.65] }),
//! );
//! assert!(matches!(geometry, CanonicalGeometry::Point(_)));
//! ```

use geo::{Coord, LineString, MultiLineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Geometry shapes retained in the merged collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GeometryWire", into = "GeometryWire")]
pub enum CanonicalGeometry {
    /// Single position.
    Point(Point<f64>),
    /// Single polyline.
    LineString(LineString<f64>),
    /// Several polylines belonging to one feature.
    MultiLineString(MultiLineString<f64>),
    /// Polygon with an exterior ring followed by any holes.
    Polygon(Polygon<f64>),
}

impl CanonicalGeometry {
    /// Return the position when the geometry is a point.
    #[must_use]
    pub const fn as_point(&self) -> Option<Point<f64>> {
        match self {
            Self::Point(point) => Some(*point),
            _ => None,
        }
    }

    /// GeoJSON type name of the geometry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
        }
    }
}

impl From<Point<f64>> for CanonicalGeometry {
    fn from(point: Point<f64>) -> Self {
        Self::Point(point)
    }
}

/// GeoJSON encoding used on disk.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeometryWire {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    MultiLineString(Vec<Vec<[f64; 2]>>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

fn line_from_pairs(pairs: Vec<[f64; 2]>) -> LineString<f64> {
    LineString::new(
        pairs
            .into_iter()
            .map(|[x, y]| Coord { x, y })
            .collect(),
    )
}

fn pairs_from_line(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|coord| [coord.x, coord.y]).collect()
}

fn polygon_from_rings(rings: Vec<LineString<f64>>) -> Polygon<f64> {
    let mut rings = rings.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

impl From<GeometryWire> for CanonicalGeometry {
    fn from(wire: GeometryWire) -> Self {
        match wire {
            GeometryWire::Point([x, y]) => Self::Point(Point::new(x, y)),
            GeometryWire::LineString(pairs) => Self::LineString(line_from_pairs(pairs)),
            GeometryWire::MultiLineString(lines) => Self::MultiLineString(MultiLineString::new(
                lines.into_iter().map(line_from_pairs).collect(),
            )),
            GeometryWire::Polygon(rings) => {
                Self::Polygon(polygon_from_rings(rings.into_iter().map(line_from_pairs).collect()))
            }
        }
    }
}

impl From<CanonicalGeometry> for GeometryWire {
    fn from(geometry: CanonicalGeometry) -> Self {
        match geometry {
            CanonicalGeometry::Point(point) => Self::Point([point.x(), point.y()]),
            CanonicalGeometry::LineString(line) => Self::LineString(pairs_from_line(&line)),
            CanonicalGeometry::MultiLineString(lines) => {
                Self::MultiLineString(lines.iter().map(pairs_from_line).collect())
            }
            CanonicalGeometry::Polygon(polygon) => Self::Polygon(
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(pairs_from_line)
                    .collect(),
            ),
        }
    }
}

/// Convert a provider geometry payload into a [`CanonicalGeometry`].
///
/// Rules are tried in order:
///
/// 1. numeric `x` and `y` members produce a point;
/// 2. a `paths` array produces a line string for a single path and a
///    multi line string otherwise;
/// 3. a `rings` array produces a polygon, one ring per entry.
///
/// Vertices that are not numeric pairs are skipped. Anything else,
/// including a geometry whose paths or rings hold no vertices, yields
/// `None`.
#[must_use]
pub fn normalize_geometry(payload: &Value) -> Option<CanonicalGeometry> {
    let object = payload.as_object()?;

    let x = object.get("x").and_then(Value::as_f64);
    let y = object.get("y").and_then(Value::as_f64);
    if let (Some(x), Some(y)) = (x, y) {
        return Some(CanonicalGeometry::Point(Point::new(x, y)));
    }

    if let Some(paths) = object.get("paths") {
        let mut lines = vertex_lists(paths)?;
        return match lines.len() {
            0 => None,
            1 => lines.pop().map(CanonicalGeometry::LineString),
            _ => Some(CanonicalGeometry::MultiLineString(MultiLineString::new(
                lines,
            ))),
        };
    }

    if let Some(rings) = object.get("rings") {
        let rings = vertex_lists(rings)?;
        if rings.is_empty() {
            return None;
        }
        return Some(CanonicalGeometry::Polygon(polygon_from_rings(rings)));
    }

    None
}

/// Build a point from an explicit longitude/latitude pair.
#[must_use]
pub const fn point_from_lon_lat(longitude: f64, latitude: f64) -> CanonicalGeometry {
    CanonicalGeometry::Point(Point(Coord {
        x: longitude,
        y: latitude,
    }))
}

fn vertex_lists(value: &Value) -> Option<Vec<LineString<f64>>> {
    let lists = value.as_array()?;
    Some(
        lists
            .iter()
            .filter_map(Value::as_array)
            .map(|vertices| vertices.iter().filter_map(vertex).collect::<Vec<_>>())
            .filter(|coords| !coords.is_empty())
            .map(LineString::new)
            .collect(),
    )
}

fn vertex(value: &Value) -> Option<Coord<f64>> {
    match value.as_array()?.as_slice() {
        [x, y, ..] => Some(Coord {
            x: x.as_f64()?,
            y: y.as_f64()?,
        }),
        _ => None,
    }
}
