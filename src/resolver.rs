//! Nearest-agency resolution
//!
//! Orders candidate agencies for a user location, either by straight-line
//! distance or by precomputed travel time from the user's census tract.

use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::directory::AgencyDirectory;
use crate::distance::{Units, distance};
use crate::models::{Coordinates, Located, TravelEdge};
use crate::tracts::TractIndex;
use crate::{PantryFinderError, Result};

/// How candidates are narrowed and ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Rank by great-circle distance from the user
    Geometric,
    /// Rank by travel time from the user's tract, within a time budget
    #[default]
    TractRouted,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Geometric => write!(f, "geometric"),
            Strategy::TractRouted => write!(f, "tract-routed"),
        }
    }
}

impl FromStr for Strategy {
    type Err = PantryFinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geometric" | "distance" => Ok(Strategy::Geometric),
            "tract-routed" | "tract_routed" | "tract" | "travel-time" => Ok(Strategy::TractRouted),
            other => Err(PantryFinderError::validation(format!(
                "Unknown strategy '{other}'. Must be one of: geometric, tract-routed"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverOptions {
    pub strategy: Strategy,
    pub time_budget_minutes: f64,
    /// Budget for the second pass when the first one finds nothing
    pub widened_time_budget_minutes: f64,
    pub max_results: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            time_budget_minutes: 20.0,
            widened_time_budget_minutes: 60.0,
            max_results: 10,
        }
    }
}

/// A ranked item and its straight-line distance from the user
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub straight_line_km: Option<f64>,
}

/// Result of one resolution pass
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub strategy: Strategy,
    /// Ordered nearest first
    pub candidates: Vec<Ranked<TravelEdge>>,
    pub tract_id: Option<u64>,
    /// Budget that produced `candidates` (tract-routed only)
    pub time_budget_minutes: Option<f64>,
    pub widened: bool,
}

impl Resolution {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn edges(&self) -> Vec<&TravelEdge> {
        self.candidates.iter().map(|ranked| &ranked.item).collect()
    }
}

pub struct NearestAgencyResolver {
    options: ResolverOptions,
}

impl NearestAgencyResolver {
    #[must_use]
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve using the configured strategy.
    ///
    /// `directory` places agencies whose edges carry no coordinates.
    pub fn resolve(
        &self,
        user: &Coordinates,
        edges: &[TravelEdge],
        tracts: Option<&TractIndex>,
        directory: &AgencyDirectory,
    ) -> Result<Resolution> {
        match self.options.strategy {
            Strategy::Geometric => Ok(self.resolve_geometric(user, edges, directory)),
            Strategy::TractRouted => {
                let tracts = tracts.ok_or_else(|| {
                    PantryFinderError::config(
                        "The tract-routed strategy needs tract boundaries (data.tracts_geojson)",
                    )
                })?;
                let tract_id = tracts.locate(user)?;
                Ok(self.resolve_from_tract(user, tract_id, edges))
            }
        }
    }

    /// Nearest agencies by straight-line distance, one edge per agency.
    ///
    /// An edge is placed at its own coordinates, else at its directory row.
    /// The first placeable edge of each agency represents it.
    #[must_use]
    pub fn resolve_geometric(
        &self,
        user: &Coordinates,
        edges: &[TravelEdge],
        directory: &AgencyDirectory,
    ) -> Resolution {
        let mut seen = HashSet::new();
        let mut placed = Vec::new();
        for edge in edges {
            let Some(coordinates) = directory.position(edge) else {
                continue;
            };
            if seen.insert(edge.name()) {
                placed.push(Placed { edge, coordinates });
            }
        }

        let candidates = rank_by_distance(user, placed, self.options.max_results)
            .into_iter()
            .map(|ranked| Ranked {
                item: ranked.item.edge.clone(),
                straight_line_km: ranked.straight_line_km,
            })
            .collect::<Vec<_>>();

        info!(
            "Geometric resolution kept {} of {} edges",
            candidates.len(),
            edges.len()
        );

        Resolution {
            strategy: Strategy::Geometric,
            candidates,
            tract_id: None,
            time_budget_minutes: None,
            widened: false,
        }
    }

    /// Agencies reachable from `tract_id`, widening the budget once if needed
    #[must_use]
    pub fn resolve_from_tract(
        &self,
        user: &Coordinates,
        tract_id: u64,
        edges: &[TravelEdge],
    ) -> Resolution {
        let initial = self.options.time_budget_minutes;
        let widened_budget = self.options.widened_time_budget_minutes;

        let mut budget = initial;
        let mut reachable = within_budget(edges, tract_id, budget);
        let mut widened = false;

        if reachable.is_empty() && widened_budget > initial {
            debug!(
                "No agencies within {} min of tract {}, widening to {} min",
                initial, tract_id, widened_budget
            );
            budget = widened_budget;
            reachable = within_budget(edges, tract_id, budget);
            widened = true;
        }

        reachable.truncate(self.options.max_results);

        let candidates = reachable
            .into_iter()
            .map(|edge| Ranked {
                straight_line_km: edge
                    .coordinates()
                    .map(|point| distance(user, &point, Units::Kilometers)),
                item: edge.clone(),
            })
            .collect::<Vec<_>>();

        info!(
            "Tract {} has {} agencies within {} min",
            tract_id,
            candidates.len(),
            budget
        );

        Resolution {
            strategy: Strategy::TractRouted,
            candidates,
            tract_id: Some(tract_id),
            time_budget_minutes: Some(budget),
            widened,
        }
    }
}

/// An edge pinned to wherever its agency was placed
struct Placed<'a> {
    edge: &'a TravelEdge,
    coordinates: Coordinates,
}

impl Located for Placed<'_> {
    fn name(&self) -> &str {
        &self.edge.agency_name
    }

    fn coordinates(&self) -> Option<Coordinates> {
        Some(self.coordinates)
    }
}

/// Edges leaving `tract_id` within `budget` minutes, fastest first.
///
/// Equal travel times keep their input order.
#[must_use]
pub fn within_budget(edges: &[TravelEdge], tract_id: u64, budget: f64) -> Vec<&TravelEdge> {
    let mut reachable: Vec<&TravelEdge> = edges
        .iter()
        .filter(|edge| edge.origin_tract_id == tract_id && edge.travel_minutes <= budget)
        .collect();
    reachable.sort_by(|a, b| a.travel_minutes.total_cmp(&b.travel_minutes));
    reachable
}

/// Rank anything with a position by distance from `user`, nearest first.
///
/// Items without usable coordinates cannot be ranked and are dropped.
/// Equal distances keep their input order.
pub fn rank_by_distance<T: Located>(
    user: &Coordinates,
    items: impl IntoIterator<Item = T>,
    max_results: usize,
) -> Vec<Ranked<T>> {
    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|item| {
            let km = distance(user, &item.coordinates()?, Units::Kilometers);
            Some((item, km))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(max_results);

    ranked
        .into_iter()
        .map(|(item, km)| Ranked {
            item,
            straight_line_km: Some(km),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgencyRecord;
    use crate::tracts::Tract;
    use geo::{MultiPolygon, polygon};

    fn scenario_edges() -> Vec<TravelEdge> {
        vec![
            TravelEdge::new(5, "A", 10.0, 3.0),
            TravelEdge::new(5, "B", 25.0, 9.0),
            TravelEdge::new(7, "C", 5.0, 1.0),
        ]
    }

    fn names(resolution: &Resolution) -> Vec<&str> {
        resolution
            .candidates
            .iter()
            .map(|ranked| ranked.item.agency_name.as_str())
            .collect()
    }

    fn resolver(strategy: Strategy) -> NearestAgencyResolver {
        NearestAgencyResolver::new(ResolverOptions {
            strategy,
            ..ResolverOptions::default()
        })
    }

    #[test]
    fn test_tract_routed_within_budget() {
        let user = Coordinates::new(0.0, 0.0);
        let resolution =
            resolver(Strategy::TractRouted).resolve_from_tract(&user, 5, &scenario_edges());

        assert_eq!(names(&resolution), vec!["A"]);
        assert_eq!(resolution.time_budget_minutes, Some(20.0));
        assert!(!resolution.widened);
    }

    #[test]
    fn test_tract_routed_widens_when_empty() {
        let user = Coordinates::new(0.0, 0.0);
        let edges: Vec<TravelEdge> = scenario_edges()
            .into_iter()
            .filter(|edge| edge.agency_name != "A")
            .collect();

        let resolution = resolver(Strategy::TractRouted).resolve_from_tract(&user, 5, &edges);

        assert_eq!(names(&resolution), vec!["B"]);
        assert_eq!(resolution.time_budget_minutes, Some(60.0));
        assert!(resolution.widened);
    }

    #[test]
    fn test_tract_routed_empty_after_widening_is_not_an_error() {
        let user = Coordinates::new(0.0, 0.0);
        let edges = vec![TravelEdge::new(5, "Far", 90.0, 40.0)];

        let resolution = resolver(Strategy::TractRouted).resolve_from_tract(&user, 5, &edges);

        assert!(resolution.is_empty());
        assert!(resolution.widened);
        assert_eq!(resolution.tract_id, Some(5));
    }

    #[test]
    fn test_no_widening_when_widened_budget_not_larger() {
        let resolver = NearestAgencyResolver::new(ResolverOptions {
            widened_time_budget_minutes: 20.0,
            ..ResolverOptions::default()
        });
        let edges = vec![TravelEdge::new(5, "B", 25.0, 9.0)];
        let resolution = resolver.resolve_from_tract(&Coordinates::new(0.0, 0.0), 5, &edges);

        assert!(resolution.is_empty());
        assert!(!resolution.widened);
    }

    #[test]
    fn test_tract_routed_orders_by_minutes_and_keeps_ties_stable() {
        let edges = vec![
            TravelEdge::new(5, "Slow", 18.0, 6.0),
            TravelEdge::new(5, "TieFirst", 7.0, 2.0),
            TravelEdge::new(5, "Fast", 3.0, 1.0),
            TravelEdge::new(5, "TieSecond", 7.0, 2.5),
        ];
        let resolver = resolver(Strategy::TractRouted);
        let user = Coordinates::new(0.0, 0.0);

        let first = resolver.resolve_from_tract(&user, 5, &edges);
        let second = resolver.resolve_from_tract(&user, 5, &edges);

        assert_eq!(names(&first), vec!["Fast", "TieFirst", "TieSecond", "Slow"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_tract_routed_truncates_to_max_results() {
        let resolver = NearestAgencyResolver::new(ResolverOptions {
            max_results: 2,
            ..ResolverOptions::default()
        });
        let edges = vec![
            TravelEdge::new(1, "A", 3.0, 1.0),
            TravelEdge::new(1, "B", 2.0, 1.0),
            TravelEdge::new(1, "C", 1.0, 1.0),
        ];
        let resolution = resolver.resolve_from_tract(&Coordinates::new(0.0, 0.0), 1, &edges);
        assert_eq!(names(&resolution), vec!["C", "B"]);
    }

    #[test]
    fn test_geometric_orders_nearest_first() {
        let edges = vec![
            TravelEdge::new(1, "Two", 1.0, 1.0).at(0.0, 2.0),
            TravelEdge::new(1, "One", 1.0, 1.0).at(0.0, 1.0),
        ];
        let resolution =
            resolver(Strategy::Geometric).resolve_geometric(
                &Coordinates::new(0.0, 0.0),
                &edges,
                &AgencyDirectory::default(),
            );

        assert_eq!(names(&resolution), vec!["One", "Two"]);
        let nearest = resolution.candidates[0].straight_line_km.unwrap();
        let next = resolution.candidates[1].straight_line_km.unwrap();
        assert!(nearest < next);
        assert_eq!(resolution.tract_id, None);
    }

    #[test]
    fn test_geometric_lists_each_agency_once_and_skips_missing_coordinates() {
        let edges = vec![
            TravelEdge::new(1, "Shared", 4.0, 1.0).at(0.0, 1.0),
            TravelEdge::new(2, "Shared", 9.0, 3.0).at(0.0, 1.0),
            TravelEdge::new(1, "Nowhere", 2.0, 1.0),
        ];
        let resolution =
            resolver(Strategy::Geometric).resolve_geometric(
                &Coordinates::new(0.0, 0.0),
                &edges,
                &AgencyDirectory::default(),
            );

        assert_eq!(names(&resolution), vec!["Shared"]);
        assert_eq!(resolution.candidates[0].item.origin_tract_id, 1);
    }

    #[test]
    fn test_geometric_places_edges_from_directory() {
        let directory = AgencyDirectory::new(vec![
            AgencyRecord::new("Far").at(0.0, 2.0),
            AgencyRecord::new("Near").at(0.0, 1.0),
        ]);
        let edges = vec![
            TravelEdge::new(1, "Far", 4.0, 1.0),
            TravelEdge::new(1, "Near", 9.0, 3.0),
        ];
        let resolution = resolver(Strategy::Geometric).resolve_geometric(
            &Coordinates::new(0.0, 0.0),
            &edges,
            &directory,
        );

        assert_eq!(names(&resolution), vec!["Near", "Far"]);
        assert!(resolution.candidates[0].straight_line_km.unwrap() < 112.0);
    }

    #[test]
    fn test_geometric_uses_first_placeable_edge() {
        let edges = vec![
            TravelEdge::new(1, "Shared", 4.0, 1.0),
            TravelEdge::new(2, "Shared", 9.0, 3.0).at(0.0, 1.0),
        ];
        let resolution = resolver(Strategy::Geometric).resolve_geometric(
            &Coordinates::new(0.0, 0.0),
            &edges,
            &AgencyDirectory::default(),
        );

        assert_eq!(names(&resolution), vec!["Shared"]);
        assert_eq!(resolution.candidates[0].item.origin_tract_id, 2);
    }

    #[test]
    fn test_resolve_dispatches_on_strategy() {
        let tracts = TractIndex::new(vec![Tract::new(
            5,
            MultiPolygon::new(vec![polygon![
                (x: -1.0, y: -1.0),
                (x: 1.0, y: -1.0),
                (x: 1.0, y: 1.0),
                (x: -1.0, y: 1.0),
                (x: -1.0, y: -1.0),
            ]]),
        )]);
        let user = Coordinates::new(0.0, 0.0);

        let resolution = resolver(Strategy::TractRouted)
            .resolve(&user, &scenario_edges(), Some(&tracts), &AgencyDirectory::default())
            .unwrap();
        assert_eq!(resolution.tract_id, Some(5));
        assert_eq!(names(&resolution), vec!["A"]);

        let outside = Coordinates::new(10.0, 10.0);
        let err = resolver(Strategy::TractRouted)
            .resolve(&outside, &scenario_edges(), Some(&tracts), &AgencyDirectory::default())
            .unwrap_err();
        assert!(matches!(err, PantryFinderError::UnmatchedLocation { .. }));
    }

    #[test]
    fn test_tract_routed_without_tracts_is_config_error() {
        let err = resolver(Strategy::TractRouted)
            .resolve(
                &Coordinates::new(0.0, 0.0),
                &scenario_edges(),
                None,
                &AgencyDirectory::default(),
            )
            .unwrap_err();
        assert!(matches!(err, PantryFinderError::Config { .. }));
    }

    #[test]
    fn test_rank_agency_records() {
        let agencies = vec![
            AgencyRecord::new("Far").at(0.0, 2.0),
            AgencyRecord::new("Unplaced"),
            AgencyRecord::new("Near").at(0.0, 1.0),
        ];
        let ranked = rank_by_distance(&Coordinates::new(0.0, 0.0), &agencies, 10);
        let order: Vec<&str> = ranked.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(order, vec!["Near", "Far"]);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("geometric".parse::<Strategy>().unwrap(), Strategy::Geometric);
        assert_eq!("Tract-Routed".parse::<Strategy>().unwrap(), Strategy::TractRouted);
        assert!("fastest".parse::<Strategy>().is_err());
        assert_eq!(Strategy::TractRouted.to_string(), "tract-routed");
    }
}
