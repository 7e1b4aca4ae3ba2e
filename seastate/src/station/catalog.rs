//! Catalogue loading and lookup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::Station;
use crate::error::CoreError;
use crate::grid::in_any_grid;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    id: String,
    name: String,
    #[serde(rename = "type")]
    station_type: Option<String>,
    #[serde(rename = "hasRealTimeData")]
    has_real_time_data: Option<bool>,
}

/// The immutable station catalogue.
#[derive(Debug)]
pub struct StationCatalog {
    stations: Vec<Station>,
    by_id: HashMap<String, usize>,
}

impl StationCatalog {
    /// Load the catalogue from a GeoJSON file.
    ///
    /// # Errors
    ///
    /// `Config` when the file is unreadable, is not a `FeatureCollection`,
    /// or yields zero usable stations.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read catalogue {}: {e}", path.display()))
        })?;
        Self::from_geojson(&text)
    }

    /// Parse a catalogue from GeoJSON text.
    pub fn from_geojson(text: &str) -> Result<Self, CoreError> {
        let collection: FeatureCollection = serde_json::from_str(text)
            .map_err(|e| CoreError::Config(format!("invalid catalogue JSON: {e}")))?;

        if collection.kind != "FeatureCollection" {
            return Err(CoreError::Config(format!(
                "catalogue root must be a FeatureCollection, got {}",
                collection.kind
            )));
        }

        let mut stations = Vec::new();
        let mut by_id = HashMap::new();

        for feature in collection.features {
            if feature.geometry.kind != "Point" || feature.geometry.coordinates.len() < 2 {
                warn!(id = %feature.properties.id, "skipping station with invalid geometry");
                continue;
            }
            let lon = feature.geometry.coordinates[0];
            let lat = feature.geometry.coordinates[1];

            let station = Station {
                id: feature.properties.id,
                name: feature.properties.name,
                lat,
                lon,
                station_type: feature
                    .properties
                    .station_type
                    .unwrap_or_else(|| "buoy".to_string()),
                has_realtime_data: feature.properties.has_real_time_data.unwrap_or(false),
                in_grid: in_any_grid(lat, lon),
            };

            by_id.insert(station.id.clone(), stations.len());
            stations.push(station);
        }

        if stations.is_empty() {
            return Err(CoreError::Config("catalogue contains no stations".into()));
        }

        info!(
            stations = stations.len(),
            in_grid = stations.iter().filter(|s| s.in_grid).count(),
            "station catalogue loaded"
        );

        Ok(Self { stations, by_id })
    }

    /// Look up a station by id.
    pub fn get(&self, id: &str) -> Option<&Station> {
        self.by_id.get(id).map(|idx| &self.stations[*idx])
    }

    /// Iterate the full catalogue.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    /// Number of stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// True when the catalogue is empty (never, post-load).
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// The catalogue as a GeoJSON FeatureCollection.
    pub fn to_geojson(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .stations
            .iter()
            .map(|s| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [s.lon, s.lat],
                    },
                    "properties": {
                        "id": s.id,
                        "name": s.name,
                        "type": s.station_type,
                        "hasRealTimeData": s.has_realtime_data,
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }

    /// The geographically closest station to a point, with its distance
    /// in kilometers.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<(&Station, f64)> {
        self.stations
            .iter()
            .map(|s| (s, haversine_km(lat, lon, s.lat, s.lon)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Great-circle distance between two points, kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-122.4, 36.8]},
                "properties": {"id": "46042", "name": "Monterey Bay", "type": "buoy", "hasRealTimeData": true}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-158.12, 21.67]},
                "properties": {"id": "51201", "name": "Waimea Bay", "type": "buoy", "hasRealTimeData": true}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-70.17, 42.8]},
                "properties": {"id": "44098", "name": "Jeffreys Ledge", "hasRealTimeData": false}
            }
        ]
    }"#;

    #[test]
    fn test_load_sample() {
        let catalog = StationCatalog::from_geojson(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);

        let monterey = catalog.get("46042").unwrap();
        assert_eq!(monterey.name, "Monterey Bay");
        assert!(monterey.has_realtime_data);
        assert!(monterey.in_grid);
        assert_eq!(monterey.station_type, "buoy");
    }

    #[test]
    fn test_out_of_grid_flag() {
        let catalog = StationCatalog::from_geojson(SAMPLE).unwrap();
        assert!(!catalog.get("51201").unwrap().in_grid);
        assert!(catalog.get("44098").unwrap().in_grid);
    }

    #[test]
    fn test_missing_properties_default() {
        let catalog = StationCatalog::from_geojson(SAMPLE).unwrap();
        let station = catalog.get("44098").unwrap();
        assert_eq!(station.station_type, "buoy");
        assert!(!station.has_realtime_data);
    }

    #[test]
    fn test_unknown_station() {
        let catalog = StationCatalog::from_geojson(SAMPLE).unwrap();
        assert!(catalog.get("99999").is_none());
    }

    #[test]
    fn test_rejects_non_feature_collection() {
        let err = StationCatalog::from_geojson(r#"{"type": "Feature", "features": []}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_catalogue() {
        let err =
            StationCatalog::from_geojson(r#"{"type": "FeatureCollection", "features": []}"#)
                .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_geojson_roundtrip_shape() {
        let catalog = StationCatalog::from_geojson(SAMPLE).unwrap();
        let geojson = catalog.to_geojson();
        assert_eq!(geojson["type"], "FeatureCollection");
        assert_eq!(geojson["features"].as_array().unwrap().len(), 3);
        assert_eq!(geojson["features"][0]["properties"]["id"], "46042");
    }

    #[test]
    fn test_nearest_station() {
        let catalog = StationCatalog::from_geojson(SAMPLE).unwrap();
        let (station, distance) = catalog.nearest(36.0, -122.0).unwrap();
        assert_eq!(station.id, "46042");
        assert!(distance < 200.0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.geojson");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = StationCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = StationCatalog::load("/nonexistent/stations.geojson").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_haversine_known_distance() {
        // San Francisco to Los Angeles is roughly 560 km.
        let d = haversine_km(37.7749, -122.4194, 34.0522, -118.2437);
        assert!((d - 559.0).abs() < 10.0, "got {d}");
    }
}
