//! Data models for the PantryFinder application
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and the user's resolved position
//! - Agency: Directory rows and joined result rows
//! - Travel: Precomputed tract-to-agency travel costs

pub mod agency;
pub mod location;
pub mod travel;

pub use agency::{AgencyRecord, AgencyResult};
pub use location::{Coordinates, UserLocation};
pub use travel::TravelEdge;

/// Anything that names an agency and may sit at a known point
pub trait Located {
    fn name(&self) -> &str;
    fn coordinates(&self) -> Option<Coordinates>;
}

impl<T: Located> Located for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn coordinates(&self) -> Option<Coordinates> {
        (**self).coordinates()
    }
}
