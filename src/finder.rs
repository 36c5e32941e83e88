//! Query pipeline
//!
//! One search runs start to finish here: parse the input, geocode it when it
//! is not already a coordinate pair, resolve nearby agencies, join directory
//! metadata and describe the map.

use std::fmt::{self, Display};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::MapConfig;
use crate::data::ReferenceData;
use crate::geocoding::{AddressInput, AddressParser, Geocoder};
use crate::map::MapLayer;
use crate::models::{AgencyResult, UserLocation};
use crate::resolver::{NearestAgencyResolver, ResolverOptions, Strategy, rank_by_distance};
use crate::{PantryFinderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Found,
    NoResultsFound,
}

/// Everything one search produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub query: String,
    pub user: UserLocation,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tract_id: Option<u64>,
    /// Budget that produced the results (tract-routed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_budget_minutes: Option<f64>,
    pub widened: bool,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub results: Vec<AgencyResult>,
    pub map: MapLayer,
    pub generated_at: DateTime<Utc>,
}

impl QueryOutcome {
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.status == QueryStatus::Found
    }
}

impl Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Your location: {}",
            self.user.coordinates.format_coordinates()
        )?;
        if let Some(label) = &self.user.label {
            writeln!(f, "  {label}")?;
        }
        if let Some(tract_id) = self.tract_id {
            writeln!(f, "Census tract: {tract_id}")?;
        }
        if let Some(message) = &self.message {
            writeln!(f, "{message}")?;
        }

        for (rank, result) in self.results.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. {}", rank + 1, result)?;
        }
        Ok(())
    }
}

/// Runs searches against shared reference data
pub struct FinderService {
    geocoder: Option<Arc<dyn Geocoder>>,
    data: Arc<ReferenceData>,
    options: ResolverOptions,
    map: MapConfig,
}

impl FinderService {
    #[must_use]
    pub fn new(data: Arc<ReferenceData>, options: ResolverOptions, map: MapConfig) -> Self {
        Self {
            geocoder: None,
            data,
            options,
            map,
        }
    }

    /// Without a geocoder only coordinate input can be searched
    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    #[must_use]
    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    /// Find the agencies nearest to `address`.
    ///
    /// `strategy` overrides the configured one for this query only.
    #[instrument(skip(self))]
    pub async fn search(&self, address: &str, strategy: Option<Strategy>) -> Result<QueryOutcome> {
        let user = self.locate(address).await?;
        let options = ResolverOptions {
            strategy: strategy.unwrap_or(self.options.strategy),
            ..self.options
        };

        let outcome = self.resolve(address.trim(), user, options)?;
        info!(
            "Search for '{}' returned {} agencies ({:?})",
            outcome.query,
            outcome.results.len(),
            outcome.status
        );
        Ok(outcome)
    }

    async fn locate(&self, address: &str) -> Result<UserLocation> {
        match AddressParser::parse(address)? {
            AddressInput::Coordinates(latitude, longitude) => {
                debug!("Input is a coordinate pair, skipping geocoding");
                Ok(UserLocation::new(latitude, longitude))
            }
            AddressInput::Address(address) => {
                let geocoder = self.geocoder.as_ref().ok_or_else(|| {
                    PantryFinderError::config(
                        "Geocoding is not configured. Set geocoding.api_key or search by 'lat,lon'.",
                    )
                })?;
                geocoder.geocode(&address).await
            }
        }
    }

    fn resolve(
        &self,
        query: &str,
        user: UserLocation,
        options: ResolverOptions,
    ) -> Result<QueryOutcome> {
        let resolver = NearestAgencyResolver::new(options);
        let data = &self.data;

        if options.strategy == Strategy::TractRouted && data.edges.is_empty() {
            return Err(PantryFinderError::data(
                "The tract-routed strategy needs a travel time table (data.travel_times_csv)",
            ));
        }

        let (results, tract_id, budget, widened) =
            if options.strategy == Strategy::Geometric && data.edges.is_empty() {
                debug!("No travel table loaded, ranking the agency directory");
                let results = rank_by_distance(
                    &user.coordinates,
                    data.directory.records(),
                    options.max_results,
                )
                .iter()
                .map(AgencyResult::from)
                .collect::<Vec<_>>();
                (results, None, None, false)
            } else {
                let resolution = resolver.resolve(
                    &user.coordinates,
                    &data.edges,
                    data.tracts.as_ref(),
                    &data.directory,
                )?;
                (
                    data.directory.join(&resolution),
                    resolution.tract_id,
                    resolution.time_budget_minutes,
                    resolution.widened,
                )
            };

        let (status, message) = if results.is_empty() {
            warn!("No agencies found for '{}'", query);
            let message = match budget {
                Some(minutes) => format!(
                    "No food assistance agencies are reachable within {minutes} minutes of your location."
                ),
                None => "No food assistance agencies with a known location were found.".to_string(),
            };
            (QueryStatus::NoResultsFound, Some(message))
        } else if widened {
            let message = format!(
                "No agencies within {} minutes; showing agencies within {} minutes.",
                options.time_budget_minutes, options.widened_time_budget_minutes
            );
            (QueryStatus::Found, Some(message))
        } else {
            (QueryStatus::Found, None)
        };

        let map = MapLayer::build(&user, &results, &self.map);

        Ok(QueryOutcome {
            query: query.to_string(),
            user,
            strategy: options.strategy,
            tract_id,
            time_budget_minutes: budget,
            widened,
            status,
            message,
            results,
            map,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::AgencyDirectory;
    use crate::models::{AgencyRecord, TravelEdge};
    use crate::tracts::{Tract, TractIndex};
    use async_trait::async_trait;
    use geo::polygon;

    struct FixedGeocoder(Option<(f64, f64)>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, address: &str) -> Result<UserLocation> {
            match self.0 {
                Some((lat, lon)) => Ok(UserLocation::new(lat, lon).with_label(address)),
                None => Err(PantryFinderError::unresolved(address, "no results")),
            }
        }
    }

    fn tracts() -> TractIndex {
        TractIndex::new(vec![Tract::new(
            1,
            polygon![
                (x: -79.0, y: 35.0),
                (x: -78.0, y: 35.0),
                (x: -78.0, y: 36.0),
                (x: -79.0, y: 36.0),
            ]
            .into(),
        )])
    }

    fn data() -> ReferenceData {
        let mut pantry = AgencyRecord::new("Pantry").at(35.6, -78.6);
        pantry.hours = Some("Mon 9-5".to_string());
        ReferenceData {
            directory: AgencyDirectory::new(vec![pantry, AgencyRecord::new("Kitchen").at(35.2, -78.2)]),
            edges: vec![
                TravelEdge::new(1, "Kitchen", 45.0, 20.0).at(35.2, -78.2),
                TravelEdge::new(1, "Pantry", 12.0, 4.0).at(35.6, -78.6),
                TravelEdge::new(1, "Unlisted", 18.0, 6.0),
            ],
            tracts: Some(tracts()),
        }
    }

    fn service(data: ReferenceData) -> FinderService {
        FinderService::new(
            Arc::new(data),
            ResolverOptions::default(),
            MapConfig::default(),
        )
        .with_geocoder(Arc::new(FixedGeocoder(Some((35.5, -78.5)))))
    }

    #[tokio::test]
    async fn test_tract_routed_search_joins_metadata() {
        let outcome = service(data()).search("1 Main St", None).await.unwrap();

        assert_eq!(outcome.status, QueryStatus::Found);
        assert_eq!(outcome.tract_id, Some(1));
        assert!(!outcome.widened);
        let names: Vec<&str> = outcome.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pantry", "Unlisted"]);
        assert_eq!(outcome.results[0].hours.as_deref(), Some("Mon 9-5"));
        assert!(outcome.results[1].hours.is_none());

        // User plus the one placed agency
        assert_eq!(outcome.map.points.len(), 2);
        assert_eq!(outcome.user.label.as_deref(), Some("1 Main St"));
    }

    #[tokio::test]
    async fn test_widened_search_reports_message() {
        let mut data = data();
        data.edges.retain(|edge| edge.agency_name == "Kitchen");
        let outcome = service(data).search("1 Main St", None).await.unwrap();

        assert!(outcome.is_found());
        assert!(outcome.widened);
        assert_eq!(outcome.time_budget_minutes, Some(60.0));
        assert!(outcome.message.unwrap().contains("60 minutes"));
    }

    #[tokio::test]
    async fn test_nothing_reachable_is_not_an_error() {
        let mut data = data();
        data.edges = vec![TravelEdge::new(1, "Far", 90.0, 50.0)];
        let outcome = service(data).search("1 Main St", None).await.unwrap();

        assert_eq!(outcome.status, QueryStatus::NoResultsFound);
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.map.points.len(), 1);
        assert!(outcome.message.is_some());
    }

    #[tokio::test]
    async fn test_geometric_on_directory_without_edges() {
        let mut data = data();
        data.edges.clear();
        let outcome = service(data)
            .search("35.59,-78.59", Some(Strategy::Geometric))
            .await
            .unwrap();

        let names: Vec<&str> = outcome.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pantry", "Kitchen"]);
        assert!(outcome.results[0].straight_line_km.unwrap() < 2.0);
        assert!(outcome.results[0].travel_minutes.is_none());
        assert!(outcome.tract_id.is_none());
    }

    #[tokio::test]
    async fn test_geometric_on_edges_without_coordinates() {
        let mut data = data();
        data.directory = AgencyDirectory::new(vec![
            AgencyRecord::new("A").at(35.51, -78.51),
            AgencyRecord::new("B").at(35.6, -78.7),
        ]);
        data.edges = vec![
            TravelEdge::new(5, "A", 10.0, 3.0),
            TravelEdge::new(5, "B", 25.0, 9.0),
        ];
        let outcome = service(data)
            .search("35.5,-78.5", Some(Strategy::Geometric))
            .await
            .unwrap();

        assert_eq!(outcome.status, QueryStatus::Found);
        let names: Vec<&str> = outcome.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(outcome.results[0].latitude, Some(35.51));
        assert_eq!(outcome.map.points.len(), 3);
    }

    #[tokio::test]
    async fn test_geometric_rows_carry_no_travel_figures() {
        let mut data = data();
        data.edges = vec![
            TravelEdge::new(5, "A", 55.0, 30.0).at(35.51, -78.51),
            TravelEdge::new(7, "A", 4.0, 1.0).at(35.51, -78.51),
        ];
        let outcome = service(data)
            .search("35.5,-78.5", Some(Strategy::Geometric))
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let row = &outcome.results[0];
        assert_eq!(row.name, "A");
        assert_eq!(row.travel_minutes, None);
        assert_eq!(row.distance_miles, None);
        assert!(row.straight_line_km.is_some());
        assert!(!outcome.to_string().contains("Travel:"));
    }

    #[tokio::test]
    async fn test_unresolved_address_halts() {
        let service = FinderService::new(
            Arc::new(data()),
            ResolverOptions::default(),
            MapConfig::default(),
        )
        .with_geocoder(Arc::new(FixedGeocoder(None)));

        let err = service.search("nowhere", None).await.unwrap_err();
        assert!(matches!(err, PantryFinderError::UnresolvedAddress { .. }));
    }

    #[tokio::test]
    async fn test_location_outside_tracts() {
        let err = service(data())
            .search("40.0,-100.0", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PantryFinderError::UnmatchedLocation { .. }));
    }

    #[tokio::test]
    async fn test_address_without_geocoder() {
        let service = FinderService::new(
            Arc::new(data()),
            ResolverOptions::default(),
            MapConfig::default(),
        );
        let err = service.search("1 Main St", None).await.unwrap_err();
        assert!(matches!(err, PantryFinderError::Config { .. }));

        // Coordinates still work
        assert!(service.search("35.5,-78.5", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_tract_routed_without_travel_table() {
        let mut data = data();
        data.edges.clear();
        let err = service(data).search("1 Main St", None).await.unwrap_err();
        assert!(matches!(err, PantryFinderError::Data { .. }));
    }

    #[tokio::test]
    async fn test_empty_address_is_rejected() {
        let err = service(data()).search("  ", None).await.unwrap_err();
        assert!(matches!(err, PantryFinderError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_outcome_display() {
        let outcome = service(data()).search("1 Main St", None).await.unwrap();
        let text = outcome.to_string();
        assert!(text.contains("Census tract: 1"));
        assert!(text.contains("1. Pantry"));
        assert!(text.contains("2. Unlisted"));
    }
}
