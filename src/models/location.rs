//! Location model for geographic coordinates

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build coordinates from optional raw columns.
    ///
    /// Returns `None` when either value is missing, not finite, or outside
    /// the valid latitude/longitude range.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        let coordinates = Self::new(latitude?, longitude?);
        coordinates.is_valid().then_some(coordinates)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Format as "lat, lon" with five decimals
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Where the user is, derived once per query
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserLocation {
    pub coordinates: Coordinates,
    /// Formatted address returned by the geocoder, if any
    pub label: Option<String>,
}

impl UserLocation {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinates: Coordinates::new(latitude, longitude),
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinates.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinates.longitude
    }
}

impl From<Coordinates> for UserLocation {
    fn from(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            label: None,
        }
    }
}
