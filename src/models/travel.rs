//! Precomputed origin-tract to agency travel costs (the ODM rows)

use serde::{Deserialize, Serialize};

use super::{Coordinates, Located};

/// Travel cost from one census tract centroid to one agency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TravelEdge {
    #[serde(alias = "GEOID", alias = "geoid", alias = "origin", alias = "origin_id")]
    pub origin_tract_id: u64,
    #[serde(
        alias = "Name",
        alias = "name",
        alias = "agency",
        alias = "destination"
    )]
    pub agency_name: String,
    #[serde(alias = "travel_time", alias = "minutes", alias = "total_time")]
    pub travel_minutes: f64,
    #[serde(alias = "distance", alias = "miles", alias = "total_distance")]
    pub distance_miles: f64,
    #[serde(
        default,
        alias = "Latitude",
        alias = "lat",
        deserialize_with = "csv::invalid_option"
    )]
    pub latitude: Option<f64>,
    #[serde(
        default,
        alias = "Longitude",
        alias = "lon",
        alias = "lng",
        deserialize_with = "csv::invalid_option"
    )]
    pub longitude: Option<f64>,
}

impl TravelEdge {
    #[must_use]
    pub fn new(
        origin_tract_id: u64,
        agency_name: impl Into<String>,
        travel_minutes: f64,
        distance_miles: f64,
    ) -> Self {
        Self {
            origin_tract_id,
            agency_name: agency_name.into(),
            travel_minutes,
            distance_miles,
            latitude: None,
            longitude: None,
        }
    }

    #[must_use]
    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Travel metrics must be non-negative and finite
    #[must_use]
    pub fn has_valid_metrics(&self) -> bool {
        self.travel_minutes.is_finite()
            && self.travel_minutes >= 0.0
            && self.distance_miles.is_finite()
            && self.distance_miles >= 0.0
    }
}

impl Located for TravelEdge {
    fn name(&self) -> &str {
        &self.agency_name
    }

    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}
