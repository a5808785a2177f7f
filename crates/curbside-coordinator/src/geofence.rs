// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arrival evaluation: great-circle distance from a reported position to a
//! destination anchor.
//!
//! Pure functions only. The state machine decides what an arrival means.

use curbside_core::{Anchor, CurbsideError, Position};
use serde::Serialize;

/// Mean Earth radius (IUGG), meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Slack absorbing floating-point error at the geofence edge.
const BOUNDARY_TOLERANCE_M: f64 = 0.01;

/// Result of one geofence check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrivalCheck {
    pub arrived: bool,
    pub distance_m: f64,
    /// Reported accuracy, when usable. Informational only.
    pub accuracy_m: Option<f64>,
}

/// Haversine distance in meters.
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();
    EARTH_RADIUS_M * c
}

/// Rejects non-finite or out-of-range coordinates.
pub fn validate_position(position: &Position) -> Result<(), CurbsideError> {
    if !position.latitude.is_finite() || !position.longitude.is_finite() {
        return Err(CurbsideError::validation(
            "position",
            "latitude and longitude must be finite numbers",
        ));
    }
    if !(-90.0..=90.0).contains(&position.latitude) {
        return Err(CurbsideError::OutOfRange {
            message: format!("latitude {} is outside [-90, 90]", position.latitude),
        });
    }
    if !(-180.0..=180.0).contains(&position.longitude) {
        return Err(CurbsideError::OutOfRange {
            message: format!("longitude {} is outside [-180, 180]", position.longitude),
        });
    }
    Ok(())
}

/// Drops zero, negative, non-finite or missing accuracy values.
pub fn usable_accuracy(accuracy_m: Option<f64>) -> Option<f64> {
    accuracy_m.filter(|a| a.is_finite() && *a > 0.0)
}

/// Whether `position` is inside the anchor's geofence (edge inclusive).
pub fn evaluate(anchor: &Anchor, position: &Position) -> Result<ArrivalCheck, CurbsideError> {
    validate_position(position)?;
    let distance_m = distance_m(
        anchor.latitude,
        anchor.longitude,
        position.latitude,
        position.longitude,
    );
    Ok(ArrivalCheck {
        arrived: distance_m <= anchor.radius_m + BOUNDARY_TOLERANCE_M,
        distance_m,
        accuracy_m: usable_accuracy(position.accuracy_m),
    })
}

/// Position `meters` due north of (`lat`, `lon`) along the meridian.
pub fn offset_north(lat: f64, lon: f64, meters: f64) -> Position {
    Position {
        latitude: lat + (meters / EARTH_RADIUS_M).to_degrees(),
        longitude: lon,
        accuracy_m: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> Anchor {
        Anchor {
            latitude: 30.0,
            longitude: -97.0,
            radius_m: 150.0,
        }
    }

    #[test]
    fn boundary_is_inclusive_and_one_meter_beyond_is_not() {
        let at_edge = offset_north(30.0, -97.0, 150.0);
        let beyond = offset_north(30.0, -97.0, 151.0);

        let edge = evaluate(&anchor(), &at_edge).unwrap();
        assert!(edge.arrived, "distance {}", edge.distance_m);
        assert!(!evaluate(&anchor(), &beyond).unwrap().arrived);
    }

    #[test]
    fn far_position_reports_distance() {
        let check = evaluate(&anchor(), &offset_north(30.0, -97.0, 2000.0)).unwrap();
        assert!(!check.arrived);
        assert!((check.distance_m - 2000.0).abs() < 0.5);
    }

    #[test]
    fn known_city_distance() {
        // Austin to Dallas, roughly 293 km.
        let d = distance_m(30.2672, -97.7431, 32.7767, -96.7970);
        assert!((d - 293_000.0).abs() < 3_000.0, "{d}");
    }

    #[test]
    fn bad_accuracy_is_ignored_not_rejected() {
        for accuracy in [Some(0.0), Some(-5.0), Some(f64::NAN), None] {
            let mut position = offset_north(30.0, -97.0, 50.0);
            position.accuracy_m = accuracy;
            let check = evaluate(&anchor(), &position).unwrap();
            assert!(check.arrived);
            assert_eq!(check.accuracy_m, None);
        }
        let mut position = offset_north(30.0, -97.0, 50.0);
        position.accuracy_m = Some(12.5);
        assert_eq!(evaluate(&anchor(), &position).unwrap().accuracy_m, Some(12.5));
    }

    #[test]
    fn invalid_coordinates_are_typed_errors() {
        let nan = Position {
            latitude: f64::NAN,
            longitude: 0.0,
            accuracy_m: None,
        };
        assert!(matches!(
            evaluate(&anchor(), &nan),
            Err(CurbsideError::Validation { .. })
        ));

        let north_of_pole = Position {
            latitude: 90.5,
            longitude: 0.0,
            accuracy_m: None,
        };
        assert!(matches!(
            evaluate(&anchor(), &north_of_pole),
            Err(CurbsideError::OutOfRange { .. })
        ));
    }

    proptest::proptest! {
        #[test]
        fn distance_is_symmetric_and_non_negative(
            lat1 in -89.0_f64..89.0,
            lon1 in -179.0_f64..179.0,
            lat2 in -89.0_f64..89.0,
            lon2 in -179.0_f64..179.0,
        ) {
            let there = distance_m(lat1, lon1, lat2, lon2);
            let back = distance_m(lat2, lon2, lat1, lon1);
            proptest::prop_assert!(there >= 0.0);
            proptest::prop_assert!((there - back).abs() < 1e-6);
        }
    }
}
