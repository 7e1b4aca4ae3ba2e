//! Observation data model.
//!
//! Every numeric field is either a finite number or absent; the upstream
//! sentinel `MM` maps to absent, never to zero. Values are carried in the
//! envelope's presentation units (feet, mph, degrees, seconds).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wind measurements from the meteorological record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Wind {
    /// Direction the wind blows from, degrees true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    /// Sustained speed, mph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Gust speed, mph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

/// One spectral component (swell train or wind wave).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpectralComponent {
    /// Component height, feet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Component period, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
    /// Compass label as published upstream (e.g. `WNW`), not degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

/// Spectral wave summary: decomposition into swell and wind-wave parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpectralSummary {
    /// Swell component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swell: Option<SpectralComponent>,
    /// Wind-wave component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_wave: Option<SpectralComponent>,
    /// Enumerated steepness label (e.g. `STEEP`, `AVERAGE`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steepness: Option<String>,
    /// Mean wave direction, degrees true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_direction: Option<f64>,
}

/// Wave measurements from the meteorological record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Waves {
    /// Significant wave height, feet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Dominant wave period, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_period: Option<f64>,
    /// Average wave period, seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_period: Option<f64>,
    /// Mean wave direction, degrees true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
    /// Spectral decomposition, when the station publishes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral: Option<SpectralSummary>,
}

/// Atmospheric measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Atmosphere {
    /// Sea-level pressure, hPa.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    /// Air temperature, °C.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_temp: Option<f64>,
    /// Water temperature, °C.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_temp: Option<f64>,
    /// Dew point, °C.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
}

/// Direction of change for wave height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightTrend {
    Steady,
    Building,
    Dropping,
}

/// Direction of change for wave period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodTrend {
    Steady,
    Lengthening,
    Shortening,
}

/// Direction of change for wind speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTrend {
    Steady,
    Increasing,
    Decreasing,
}

/// Recent-trend descriptors over the last ~4 hours of observations.
///
/// A field is absent when fewer than two valid samples fell inside the
/// window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_height: Option<HeightTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_period: Option<PeriodTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<SpeedTrend>,
}

impl Trend {
    /// True when no field resolved.
    pub fn is_empty(&self) -> bool {
        self.wave_height.is_none() && self.wave_period.is_none() && self.wind_speed.is_none()
    }
}

/// Which wave family dominates the spectral decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantPartition {
    Mixed,
    SwellOnly,
    WindWaveOnly,
}

/// Beaufort category resolved from wind speed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindCategory {
    /// Beaufort name (e.g. `Fresh Breeze`).
    pub name: &'static str,
    /// Matching sea-state description.
    pub seas: &'static str,
}

/// Age of the newest observation relative to fetch time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAge {
    /// Minutes since the observation timestamp.
    pub minutes: f64,
    /// True past 45 minutes, when the producer has likely skipped a publish.
    pub is_stale: bool,
}

/// A complete station observation: newest measurements plus derived
/// trend, category, and mariner summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Observation timestamp, UTC.
    pub time: DateTime<Utc>,
    pub wind: Wind,
    pub waves: Waves,
    pub atmosphere: Atmosphere,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_category: Option<WindCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_partition: Option<DominantPartition>,
    /// Deterministic one-sentence mariner summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub data_age: DataAge,
}

/// Meters to feet.
pub fn meters_to_feet(m: f64) -> f64 {
    m * 3.28084
}

/// Upstream wind speeds to mph (the factor the source system used).
pub fn speed_to_mph(v: f64) -> f64 {
    v * 1.15078
}
