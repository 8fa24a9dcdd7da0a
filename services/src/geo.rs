use serde::{Deserialize, Serialize};

use crate::error::AttendanceError;

/// Mean Earth radius in meters (spherical approximation).
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn in_physical_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance between two points, via the Haversine formula.
///
/// Deterministic and symmetric; identical points yield zero.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Rejects geofences with coordinates outside physical range or a
/// non-positive radius.
pub fn validate_geofence(
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
) -> Result<(), AttendanceError> {
    let center = Coordinate::new(latitude, longitude);
    if !center.in_physical_range() {
        return Err(AttendanceError::InvalidInput(
            "latitude must be within [-90, 90] and longitude within [-180, 180]".into(),
        ));
    }
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(AttendanceError::InvalidInput(
            "radius_meters must be a positive number".into(),
        ));
    }
    Ok(())
}
