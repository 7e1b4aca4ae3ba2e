//! Parsers for the two tabular realtime products.
//!
//! Both files are whitespace-separated columns with `#`-prefixed header
//! lines and the newest row first. The sentinel `MM` means "measurement
//! missing" and always parses to `None`.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::CoreError;

/// One parsed meteorological row, raw upstream units (meters, m/s).
#[derive(Debug, Clone, PartialEq)]
pub struct MetRow {
    pub time: DateTime<Utc>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub gust: Option<f64>,
    pub wave_height: Option<f64>,
    pub dominant_period: Option<f64>,
    pub average_period: Option<f64>,
    pub wave_direction: Option<f64>,
    pub pressure: Option<f64>,
    pub air_temp: Option<f64>,
    pub water_temp: Option<f64>,
    pub dew_point: Option<f64>,
}

/// The newest parsed spectral row, raw upstream units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralRow {
    pub total_height: Option<f64>,
    pub swell_height: Option<f64>,
    pub swell_period: Option<f64>,
    pub wind_wave_height: Option<f64>,
    pub wind_wave_period: Option<f64>,
    pub swell_direction: Option<String>,
    pub wind_wave_direction: Option<String>,
    pub steepness: Option<String>,
    pub average_period: Option<f64>,
    pub mean_direction: Option<f64>,
}

fn field(tokens: &[&str], idx: usize) -> Option<f64> {
    tokens
        .get(idx)
        .filter(|t| **t != "MM")
        .and_then(|t| t.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn label(tokens: &[&str], idx: usize) -> Option<String> {
    tokens
        .get(idx)
        .filter(|t| **t != "MM" && !t.is_empty())
        .map(|t| t.to_string())
}

fn parse_row_time(tokens: &[&str]) -> Option<DateTime<Utc>> {
    if tokens.len() < 5 {
        return None;
    }
    let mut year: i32 = tokens[0].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let month: u32 = tokens[1].parse().ok()?;
    let day: u32 = tokens[2].parse().ok()?;
    let hour: u32 = tokens[3].parse().ok()?;
    let minute: u32 = tokens[4].parse().ok()?;

    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
}

/// Parse the meteorological record into rows, newest first.
///
/// Rows with an unparseable timestamp are dropped; a file with no usable
/// rows at all is `NoData`.
pub fn parse_met(station_id: &str, body: &str) -> Result<Vec<MetRow>, CoreError> {
    let mut rows = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(time) = parse_row_time(&tokens) else {
            continue;
        };

        rows.push(MetRow {
            time,
            wind_direction: field(&tokens, 5),
            wind_speed: field(&tokens, 6),
            gust: field(&tokens, 7),
            wave_height: field(&tokens, 8),
            dominant_period: field(&tokens, 9),
            average_period: field(&tokens, 10),
            wave_direction: field(&tokens, 11),
            pressure: field(&tokens, 12),
            air_temp: field(&tokens, 13),
            water_temp: field(&tokens, 14),
            dew_point: field(&tokens, 15),
        });
    }

    if rows.is_empty() {
        return Err(CoreError::NoData(station_id.to_string()));
    }
    Ok(rows)
}

/// Parse the newest row of the spectral record, if any.
pub fn parse_spectral(body: &str) -> Option<SpectralRow> {
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if parse_row_time(&tokens).is_none() {
            continue;
        }

        return Some(SpectralRow {
            total_height: field(&tokens, 5),
            swell_height: field(&tokens, 6),
            swell_period: field(&tokens, 7),
            wind_wave_height: field(&tokens, 8),
            wind_wave_period: field(&tokens, 9),
            swell_direction: label(&tokens, 10),
            wind_wave_direction: label(&tokens, 11),
            steepness: label(&tokens, 12),
            average_period: field(&tokens, 13),
            mean_direction: field(&tokens, 14),
        });
    }
    None
}
