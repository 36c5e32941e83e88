//! Reference data loading
//!
//! Reads the agency directory and the travel-time table from CSV and the
//! tract boundaries from GeoJSON into typed in-memory tables. The tables are
//! loaded once and shared read-only across queries.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, Value};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::config::DataConfig;
use crate::directory::AgencyDirectory;
use crate::models::{AgencyRecord, TravelEdge};
use crate::tracts::{Tract, TractIndex};

/// Everything a query reads, loaded once per process
#[derive(Default)]
pub struct ReferenceData {
    pub directory: AgencyDirectory,
    pub edges: Vec<TravelEdge>,
    pub tracts: Option<TractIndex>,
}

impl ReferenceData {
    /// Load whichever datasets are configured
    pub fn load(config: &DataConfig) -> Result<Self> {
        let agencies = match &config.agencies_csv {
            Some(path) => load_agencies(path)?,
            None => Vec::new(),
        };
        let edges = match &config.travel_times_csv {
            Some(path) => load_travel_edges(path)?,
            None => Vec::new(),
        };
        let tracts = match &config.tracts_geojson {
            Some(path) => Some(TractIndex::new(load_tracts(path)?)),
            None => None,
        };

        if agencies.is_empty() && edges.is_empty() {
            warn!("No agency directory or travel-time table configured; searches will find nothing");
        }

        info!(
            "Loaded {} agencies, {} travel edges, {} tracts",
            agencies.len(),
            edges.len(),
            tracts.as_ref().map_or(0, TractIndex::len)
        );

        Ok(Self {
            directory: AgencyDirectory::new(agencies),
            edges,
            tracts,
        })
    }
}

/// Load the agency directory CSV
pub fn load_agencies(path: &Path) -> Result<Vec<AgencyRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open agency CSV: {}", path.display()))?;
    read_agencies(file).with_context(|| format!("Failed to read agency CSV: {}", path.display()))
}

pub fn read_agencies<R: Read>(reader: R) -> Result<Vec<AgencyRecord>> {
    let agencies: Vec<AgencyRecord> = read_rows::<AgencyRecord, _>(reader, "agency")?
        .into_iter()
        .filter(|record: &AgencyRecord| {
            let named = !record.name.trim().is_empty();
            if !named {
                warn!("Skipping agency row without a name");
            }
            named
        })
        .collect();
    debug!("Read {} agency rows", agencies.len());
    Ok(agencies)
}

/// Load the tract-to-agency travel time CSV
pub fn load_travel_edges(path: &Path) -> Result<Vec<TravelEdge>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open travel time CSV: {}", path.display()))?;
    read_travel_edges(file)
        .with_context(|| format!("Failed to read travel time CSV: {}", path.display()))
}

/// Rows with negative or non-finite metrics are skipped
pub fn read_travel_edges<R: Read>(reader: R) -> Result<Vec<TravelEdge>> {
    let edges: Vec<TravelEdge> = read_rows::<TravelEdge, _>(reader, "travel edge")?
        .into_iter()
        .filter(|edge: &TravelEdge| {
            let valid = edge.has_valid_metrics();
            if !valid {
                warn!(
                    "Skipping travel edge {} -> '{}' with invalid metrics ({} min, {} mi)",
                    edge.origin_tract_id, edge.agency_name, edge.travel_minutes, edge.distance_miles
                );
            }
            valid
        })
        .collect();
    debug!("Read {} travel edges", edges.len());
    Ok(edges)
}

/// Deserialize every row, skipping the ones that do not fit `T`
fn read_rows<T: DeserializeOwned, R: Read>(reader: R, kind: &str) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, row) in reader.deserialize::<T>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(anyhow!(e).context(format!("I/O error reading {kind} rows")));
            }
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed {} row {}: {}", kind, line + 2, e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed {} rows", skipped, kind);
    }
    Ok(rows)
}

/// Load tract boundaries from a GeoJSON feature collection
pub fn load_tracts(path: &Path) -> Result<Vec<Tract>> {
    let geojson_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
    parse_tracts(&geojson_str)
        .with_context(|| format!("Failed to load tracts from {}", path.display()))
}

pub fn parse_tracts(geojson_str: &str) -> Result<Vec<Tract>> {
    let geojson = geojson_str
        .parse::<GeoJson>()
        .context("Failed to parse GeoJSON")?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => bail!("Tract GeoJSON must contain features with a GEOID"),
    };

    let mut tracts = Vec::with_capacity(features.len());
    for feature in &features {
        match feature_to_tract(feature) {
            Ok(tract) => tracts.push(tract),
            Err(e) => warn!("Skipping tract feature: {:#}", e),
        }
    }

    debug!("Parsed {} of {} tract features", tracts.len(), features.len());
    Ok(tracts)
}

fn feature_to_tract(feature: &Feature) -> Result<Tract> {
    let tract_id = ["GEOID", "geoid", "tract_id", "GEOID10", "GEOID20"]
        .iter()
        .find_map(|key| feature.property(key))
        .and_then(tract_id_from_json)
        .context("Feature has no usable GEOID property")?;

    let geometry = feature
        .geometry
        .as_ref()
        .with_context(|| format!("Tract {tract_id} has no geometry"))?;

    let boundary = match &geometry.value {
        Value::Polygon(rings) => MultiPolygon::new(vec![polygon_from_rings(rings)?]),
        Value::MultiPolygon(polygons) => MultiPolygon::new(
            polygons
                .iter()
                .map(|rings| polygon_from_rings(rings))
                .collect::<Result<Vec<_>>>()?,
        ),
        _ => bail!("Tract {tract_id} geometry must be a Polygon or MultiPolygon"),
    };

    Ok(Tract::new(tract_id, boundary))
}

fn tract_id_from_json(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(number) => number.as_u64(),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let (exterior, holes) = rings.split_first().context("Polygon has no rings")?;
    Ok(Polygon::new(
        ring_to_line_string(exterior)?,
        holes
            .iter()
            .map(|ring| ring_to_line_string(ring))
            .collect::<Result<Vec<_>>>()?,
    ))
}

fn ring_to_line_string(ring: &[Vec<f64>]) -> Result<LineString<f64>> {
    let coords = ring
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(anyhow!("Position needs at least two values")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::from(coords))
}
