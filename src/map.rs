//! Map description: points, colours and the initial view
//!
//! The service does not render tiles. It emits what a scatterplot map widget
//! needs: one point for the user, one per placed agency, and a view centred
//! on the user.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::MapConfig;
use crate::models::{AgencyResult, UserLocation};

pub const USER_LABEL: &str = "Your Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    User,
    Agency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    /// RGB
    pub color: [u8; 3],
    pub tooltip: String,
    pub kind: PointKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    /// Scatterplot point radius in meters
    pub point_radius: f64,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub view: MapView,
    pub points: Vec<MapPoint>,
}

impl MapLayer {
    /// User point first, then every result that has usable coordinates
    #[must_use]
    pub fn build(user: &UserLocation, results: &[AgencyResult], config: &MapConfig) -> Self {
        let mut points = Vec::with_capacity(results.len() + 1);
        points.push(MapPoint {
            label: USER_LABEL.to_string(),
            latitude: user.latitude(),
            longitude: user.longitude(),
            color: config.user_color,
            tooltip: USER_LABEL.to_string(),
            kind: PointKind::User,
        });

        for result in results {
            let Some(coordinates) = result.coordinates() else {
                debug!("Agency '{}' has no coordinates, leaving it off the map", result.name);
                continue;
            };
            points.push(MapPoint {
                label: result.name.clone(),
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
                color: config.agency_color,
                tooltip: format!("Agency: {}", result.name),
                kind: PointKind::Agency,
            });
        }

        Self {
            view: MapView {
                latitude: user.latitude(),
                longitude: user.longitude(),
                zoom: config.zoom,
                pitch: config.pitch,
                point_radius: config.point_radius,
                style: config.style.clone(),
            },
            points,
        }
    }

    #[must_use]
    pub fn agency_points(&self) -> impl Iterator<Item = &MapPoint> {
        self.points
            .iter()
            .filter(|point| point.kind == PointKind::Agency)
    }

    /// Export the points as a GeoJSON feature collection
    #[must_use]
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .points
            .iter()
            .map(|point| {
                let mut properties = JsonObject::new();
                properties.insert("label".to_string(), json!(point.label));
                properties.insert("tooltip".to_string(), json!(point.tooltip));
                properties.insert("color".to_string(), json!(point.color));
                properties.insert("kind".to_string(), json!(point.kind));

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![
                        point.longitude,
                        point.latitude,
                    ]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}
