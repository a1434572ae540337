//! Plausibility checks for harvested coordinates.

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::RejectionReason;

/// Inclusive latitude/longitude window that accepted points must fall in.
///
/// The default window covers the national territory the harvest targets.
///
/// # Examples
///
/// ```
/// use nodeharvest_core::{BoundingBox, RejectionReason};
///
/// let bounds = BoundingBox::default();
/// assert!(bounds.validate(-74.08, 4.65).is_ok());
/// assert_eq!(bounds.validate(-74.08, 10.5), Err(RejectionReason::OutOfBounds));
/// assert_eq!(bounds.validate(0.0, 0.0), Err(RejectionReason::ZeroCoordinates));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBox {
    /// Southern edge in degrees.
    pub min_latitude: f64,
    /// Northern edge in degrees.
    pub max_latitude: f64,
    /// Western edge in degrees.
    pub min_longitude: f64,
    /// Eastern edge in degrees.
    pub max_longitude: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min_latitude: 3.0,
            max_latitude: 7.0,
            min_longitude: -80.0,
            max_longitude: -73.0,
        }
    }
}

impl BoundingBox {
    /// Return whether the coordinate lies inside the window.
    #[must_use]
    pub fn contains(&self, coord: Coord<f64>) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&coord.y)
            && (self.min_longitude..=self.max_longitude).contains(&coord.x)
    }

    /// Validate a longitude/latitude pair and return it as a coordinate.
    ///
    /// A pair is rejected when either axis is not finite, when either axis is
    /// exactly zero (the placeholder services emit for unknown positions), or
    /// when it falls outside the window.
    pub fn validate(&self, longitude: f64, latitude: f64) -> Result<Coord<f64>, RejectionReason> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(RejectionReason::NonNumericCoordinates);
        }
        if longitude == 0.0 || latitude == 0.0 {
            return Err(RejectionReason::ZeroCoordinates);
        }
        let coord = Coord {
            x: longitude,
            y: latitude,
        };
        if self.contains(coord) {
            Ok(coord)
        } else {
            Err(RejectionReason::OutOfBounds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bogota(-74.08, 4.65)]
    #[case::south_west_corner(-80.0, 3.0)]
    #[case::north_east_corner(-73.0, 7.0)]
    fn accepts_points_inside_window(#[case] lon: f64, #[case] lat: f64) {
        let coord = BoundingBox::default().validate(lon, lat).expect("inside");
        assert_eq!(coord, Coord { x: lon, y: lat });
    }

    #[rstest]
    #[case::origin(0.0, 0.0, RejectionReason::ZeroCoordinates)]
    #[case::zero_latitude(-74.08, 0.0, RejectionReason::ZeroCoordinates)]
    #[case::north_of_window(-74.08, 10.5, RejectionReason::OutOfBounds)]
    #[case::east_of_window(-60.0, 4.65, RejectionReason::OutOfBounds)]
    #[case::nan(f64::NAN, 4.65, RejectionReason::NonNumericCoordinates)]
    #[case::infinite(-74.08, f64::INFINITY, RejectionReason::NonNumericCoordinates)]
    fn rejects_implausible_points(
        #[case] lon: f64,
        #[case] lat: f64,
        #[case] expected: RejectionReason,
    ) {
        assert_eq!(BoundingBox::default().validate(lon, lat), Err(expected));
    }

    #[rstest]
    fn partial_config_falls_back_to_defaults() {
        let bounds: BoundingBox =
            serde_json::from_str(r#"{ "max_latitude": 12.5 }"#).expect("deserialise");
        assert_eq!(bounds.max_latitude, 12.5);
        assert_eq!(bounds.min_latitude, 3.0);
    }
}
