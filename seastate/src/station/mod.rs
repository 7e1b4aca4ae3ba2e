//! Station catalogue: loaded once at startup, immutable thereafter.

mod catalog;

pub use catalog::{haversine_km, StationCatalog};

use serde::Serialize;

/// One offshore station from the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    /// Station identifier. Treated as an opaque string; a few catalogue
    /// ids are longer than the canonical seven characters.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Latitude, degrees.
    pub lat: f64,
    /// Longitude, degrees, as published ([-180, 180]).
    pub lon: f64,
    /// Station type label (e.g. `buoy`).
    pub station_type: String,
    /// Whether the station publishes realtime observations.
    pub has_realtime_data: bool,
    /// Whether some regional model grid covers the station.
    pub in_grid: bool,
}
