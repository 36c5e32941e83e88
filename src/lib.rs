//! `PantryFinder` - nearest food assistance agency lookup
//!
//! This library geocodes a user's address, places it in a census tract and
//! finds the food assistance agencies reachable from there, either by
//! precomputed travel time or by straight-line distance.

pub mod api;
pub mod config;
pub mod data;
pub mod directory;
pub mod distance;
pub mod error;
pub mod finder;
pub mod geocoding;
pub mod logging;
pub mod map;
pub mod models;
pub mod resolver;
pub mod tracts;
pub mod web;

// Re-export core types for public API
pub use config::PantryFinderConfig;
pub use data::ReferenceData;
pub use directory::AgencyDirectory;
pub use error::PantryFinderError;
pub use finder::{FinderService, QueryOutcome, QueryStatus};
pub use geocoding::{AddressInput, AddressParser, Geocoder, OpenCageGeocoder};
pub use map::{MapLayer, MapPoint, MapView};
pub use models::{AgencyRecord, AgencyResult, Coordinates, TravelEdge, UserLocation};
pub use resolver::{NearestAgencyResolver, Resolution, ResolverOptions, Strategy};
pub use tracts::{Tract, TractIndex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PantryFinderError>;
