//! Great-circle distance between two coordinates

use serde::{Deserialize, Serialize};

use crate::models::Coordinates;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers to statute miles
pub const KM_TO_MILES: f64 = 0.621_371;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Kilometers,
    Miles,
}

/// Haversine distance between `from` and `to`.
///
/// `a` is clamped to [0, 1] so floating point overshoot near antipodal or
/// coincident points cannot push `asin` out of its domain.
#[must_use]
pub fn distance(from: &Coordinates, to: &Coordinates, units: Units) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    let km = EARTH_RADIUS_KM * c;

    match units {
        Units::Kilometers => km,
        Units::Miles => km * KM_TO_MILES,
    }
}
