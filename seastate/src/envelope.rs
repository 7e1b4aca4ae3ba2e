//! The merged per-station response envelope.
//!
//! Composition is pure: the same station, observation, and forecast
//! outcome always produce a structurally equal envelope apart from the
//! `generated` metadata timestamp. Absent fields are omitted from JSON
//! rather than serialized as null.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::buoy::Observation;
use crate::error::CoreError;
use crate::forecast::Forecast;
use crate::station::Station;

/// Station identification echoed at the top of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationHeader {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<&Station> for StationHeader {
    fn from(station: &Station) -> Self {
        Self {
            id: station.id.clone(),
            name: station.name.clone(),
            lat: station.lat,
            lon: station.lon,
        }
    }
}

/// Error stub carried in place of forecast data when the forecast half
/// of a request failed. Never used for out-of-grid stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastError {
    pub kind: String,
    pub message: String,
}

impl From<&CoreError> for ForecastError {
    fn from(err: &CoreError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// The forecast slot: data, or an error stub.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForecastOutcome {
    Data(Forecast),
    Failed { error: ForecastError },
}

/// Fixed unit labels for every numeric family in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Units {
    pub wave_height: &'static str,
    pub wind_speed: &'static str,
    pub direction: &'static str,
    pub period: &'static str,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            wave_height: "ft",
            wind_speed: "mph",
            direction: "degrees",
            period: "seconds",
        }
    }
}

/// The merged snapshot served for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub station: StationHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<Observation>,
    /// Omitted entirely for stations outside every model grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastOutcome>,
    pub units: Units,
    /// When this envelope was composed.
    pub generated: DateTime<Utc>,
}

impl Envelope {
    /// Compose an envelope from its parts.
    pub fn compose(
        station: &Station,
        observations: Option<Observation>,
        forecast: Option<ForecastOutcome>,
        generated: DateTime<Utc>,
    ) -> Self {
        Self {
            station: station.into(),
            observations,
            forecast,
            units: Units::default(),
            generated,
        }
    }
}
