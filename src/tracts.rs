//! Census tract boundaries and point-in-polygon lookup

use geo::{BoundingRect, Contains, Intersects, MultiPolygon, Point, Rect};
use tracing::debug;

use crate::models::Coordinates;
use crate::{PantryFinderError, Result};

/// One census tract and its boundary (x = longitude, y = latitude)
#[derive(Debug, Clone)]
pub struct Tract {
    pub tract_id: u64,
    pub boundary: MultiPolygon<f64>,
}

impl Tract {
    #[must_use]
    pub fn new(tract_id: u64, boundary: MultiPolygon<f64>) -> Self {
        Self { tract_id, boundary }
    }
}

struct IndexedTract {
    tract: Tract,
    bounds: Option<Rect<f64>>,
}

/// Set of non-overlapping tract polygons
pub struct TractIndex {
    tracts: Vec<IndexedTract>,
}

impl TractIndex {
    #[must_use]
    pub fn new(tracts: Vec<Tract>) -> Self {
        let tracts = tracts
            .into_iter()
            .map(|tract| {
                let bounds = tract.boundary.bounding_rect();
                IndexedTract { tract, bounds }
            })
            .collect();
        Self { tracts }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracts.is_empty()
    }

    /// Find the tract containing `location`.
    ///
    /// Interior matches win. A point lying exactly on a shared edge resolves
    /// to the first tract, in load order, whose boundary touches it.
    pub fn locate(&self, location: &Coordinates) -> Result<u64> {
        let point = Point::new(location.longitude, location.latitude);

        let candidates: Vec<&Tract> = self
            .tracts
            .iter()
            .filter(|indexed| {
                indexed.bounds.is_some_and(|bounds| {
                    let (min, max) = (bounds.min(), bounds.max());
                    (min.x..=max.x).contains(&point.x()) && (min.y..=max.y).contains(&point.y())
                })
            })
            .map(|indexed| &indexed.tract)
            .collect();

        let matched = candidates
            .iter()
            .find(|tract| tract.boundary.contains(&point))
            .or_else(|| {
                candidates
                    .iter()
                    .find(|tract| tract.boundary.intersects(&point))
            });

        match matched {
            Some(tract) => {
                debug!(
                    "Location {} is in tract {}",
                    location.format_coordinates(),
                    tract.tract_id
                );
                Ok(tract.tract_id)
            }
            None => Err(PantryFinderError::unmatched(
                location.latitude,
                location.longitude,
            )),
        }
    }
}
