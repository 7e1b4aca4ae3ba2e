//! Forecast data model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A wave partition sample (primary, wind-wave, or one swell train).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WavePartition {
    /// Height in meters, as sampled from the model.
    pub height_m: f64,
    /// Height in feet.
    pub height_ft: f64,
    /// Mean period, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
    /// Direction, degrees true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
}

/// Forecast wind sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastWind {
    /// Speed, mph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Direction the wind blows from, degrees true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    /// U component, m/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<f64>,
    /// V component, m/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<f64>,
}

/// One forecast period. Present only when the primary wave height was
/// sampled; partitions appear only when their own height was sampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPeriod {
    /// Valid time, UTC.
    pub time: DateTime<Utc>,
    /// Primary (combined) wave.
    pub waves: WavePartition,
    /// Wind-wave partition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_wave: Option<WavePartition>,
    /// Swell trains, tallest first, up to three.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub swell: Vec<WavePartition>,
    /// Forecast wind.
    pub wind: ForecastWind,
}

/// Identification of the model run a forecast came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastCycle {
    /// Run date, `YYYYMMDD`.
    pub date: String,
    /// Cycle hour, `HH`.
    pub hour: String,
}

/// Echo of the resolved grid location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLocation {
    /// Requested latitude.
    pub lat: f64,
    /// Requested longitude, normalized to [0, 360).
    pub lon: f64,
    /// Grid row (latitude index).
    pub row: usize,
    /// Grid column (longitude index).
    pub col: usize,
}

/// A complete point forecast: model, run, location echo, ordered periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Regional model identifier (e.g. `wcoast.0p16`).
    pub model: String,
    /// Model run the data came from.
    pub cycle: ForecastCycle,
    /// Where on the grid the request landed.
    pub location: GridLocation,
    /// Time-ordered periods, 3-hour spacing.
    pub periods: Vec<ForecastPeriod>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_partitions_skipped_in_json() {
        let period = ForecastPeriod {
            time: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
            waves: WavePartition {
                height_m: 1.0,
                height_ft: 3.28084,
                period: Some(12.0),
                direction: None,
            },
            wind_wave: None,
            swell: Vec::new(),
            wind: ForecastWind::default(),
        };
        let json = serde_json::to_value(&period).unwrap();
        assert!(json.get("wind_wave").is_none());
        assert!(json.get("swell").is_none());
        assert!(json["waves"].get("direction").is_none());
    }
}
