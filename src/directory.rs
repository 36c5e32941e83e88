//! Agency directory keyed by name, and the join onto ranked candidates

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::{AgencyRecord, AgencyResult, Coordinates, Located, TravelEdge};
use crate::resolver::{Ranked, Resolution, Strategy};

/// Agency metadata indexed by trimmed name
#[derive(Debug, Default)]
pub struct AgencyDirectory {
    records: Vec<AgencyRecord>,
    by_name: HashMap<String, usize>,
}

impl AgencyDirectory {
    /// Build the index. When names repeat, the first row wins.
    #[must_use]
    pub fn new(records: Vec<AgencyRecord>) -> Self {
        let mut by_name = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let key = record.name.trim().to_string();
            if by_name.contains_key(&key) {
                warn!("Duplicate agency name '{}' in directory, keeping first row", key);
                continue;
            }
            by_name.insert(key, position);
        }
        Self { records, by_name }
    }

    #[must_use]
    pub fn records(&self) -> &[AgencyRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AgencyRecord> {
        self.by_name
            .get(name.trim())
            .map(|&position| &self.records[position])
    }

    /// Where an edge's agency sits: the edge's own coordinate pair, else
    /// the directory row's
    #[must_use]
    pub fn position(&self, edge: &TravelEdge) -> Option<Coordinates> {
        place(edge, self.get(&edge.agency_name))
    }

    /// Left-outer join of resolved edges onto directory metadata.
    ///
    /// Every edge yields a row. Missing metadata leaves contact, hours and
    /// address empty. Travel figures are kept only for tract-routed
    /// resolutions, where they were measured from the user's own tract.
    #[must_use]
    pub fn join(&self, resolution: &Resolution) -> Vec<AgencyResult> {
        let routed = resolution.strategy == Strategy::TractRouted;
        resolution
            .candidates
            .iter()
            .map(|ranked| {
                let edge = &ranked.item;
                let metadata = self.get(&edge.agency_name);
                if metadata.is_none() {
                    debug!("No directory entry for agency '{}'", edge.agency_name);
                }
                let coordinates = place(edge, metadata);

                AgencyResult {
                    name: edge.agency_name.clone(),
                    contact: metadata.and_then(|m| m.contact.clone()),
                    hours: metadata.and_then(|m| m.hours.clone()),
                    address: metadata.and_then(|m| m.address.clone()),
                    travel_minutes: routed.then_some(edge.travel_minutes),
                    distance_miles: routed.then_some(edge.distance_miles),
                    straight_line_km: ranked.straight_line_km,
                    latitude: coordinates.map(|c| c.latitude),
                    longitude: coordinates.map(|c| c.longitude),
                }
            })
            .collect()
    }
}

fn place(edge: &TravelEdge, metadata: Option<&AgencyRecord>) -> Option<Coordinates> {
    edge.coordinates().or_else(|| metadata.and_then(Located::coordinates))
}

impl From<&Ranked<&AgencyRecord>> for AgencyResult {
    fn from(ranked: &Ranked<&AgencyRecord>) -> Self {
        let record = ranked.item;
        Self {
            name: record.name.clone(),
            contact: record.contact.clone(),
            hours: record.hours.clone(),
            address: record.address.clone(),
            travel_minutes: None,
            distance_miles: None,
            straight_line_km: ranked.straight_line_km,
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}
