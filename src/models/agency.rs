//! Agency directory rows and the joined result rows shown to users

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Coordinates, Located};

/// One row of the agency directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgencyRecord {
    #[serde(alias = "Name", alias = "NAME", alias = "agency", alias = "Agency")]
    pub name: String,
    #[serde(default, alias = "Contact", alias = "CONTACT", alias = "phone", alias = "Phone")]
    pub contact: Option<String>,
    #[serde(default, alias = "Hours", alias = "HOURS")]
    pub hours: Option<String>,
    #[serde(default, alias = "Address", alias = "ADDRESS")]
    pub address: Option<String>,
    #[serde(
        default,
        alias = "Latitude",
        alias = "LATITUDE",
        alias = "lat",
        deserialize_with = "csv::invalid_option"
    )]
    pub latitude: Option<f64>,
    #[serde(
        default,
        alias = "Longitude",
        alias = "LONGITUDE",
        alias = "lon",
        alias = "lng",
        deserialize_with = "csv::invalid_option"
    )]
    pub longitude: Option<f64>,
}

impl AgencyRecord {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: None,
            hours: None,
            address: None,
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
}

impl Located for AgencyRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

/// A resolved agency with its metadata and travel metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgencyResult {
    pub name: String,
    pub contact: Option<String>,
    pub hours: Option<String>,
    pub address: Option<String>,
    /// Precomputed travel time from the user's tract, when known
    pub travel_minutes: Option<f64>,
    /// Precomputed travel distance from the user's tract, when known
    pub distance_miles: Option<f64>,
    /// Great-circle distance from the user
    pub straight_line_km: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AgencyResult {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

impl Display for AgencyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.name)?;

        if let Some(address) = &self.address {
            writeln!(f, "   Address: {address}")?;
        }
        if let Some(contact) = &self.contact {
            writeln!(f, "   Contact: {contact}")?;
        }
        if let Some(hours) = &self.hours {
            writeln!(f, "   Hours:   {hours}")?;
        }
        match (self.travel_minutes, self.distance_miles) {
            (Some(minutes), Some(miles)) => {
                writeln!(f, "   Travel:  {minutes:.0} min ({miles:.1} mi)")?;
            }
            (Some(minutes), None) => writeln!(f, "   Travel:  {minutes:.0} min")?,
            _ => {}
        }
        if let Some(km) = self.straight_line_km {
            writeln!(f, "   Distance: {km:.1} km")?;
        }
        Ok(())
    }
}
