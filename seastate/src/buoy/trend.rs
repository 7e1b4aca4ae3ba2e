//! Trend derivation and wind-condition categorisation.

use super::parser::MetRow;
use super::types::{
    meters_to_feet, speed_to_mph, DominantPartition, HeightTrend, PeriodTrend, SpeedTrend, Trend,
    WindCategory,
};

/// Observations examined for the trend window (~4 h at 30-minute cadence).
pub const TREND_WINDOW: usize = 8;

/// Wave-height delta below which the trend reads steady, feet.
const HEIGHT_THRESHOLD_FT: f64 = 0.5;

/// Period delta below which the trend reads steady, seconds.
const PERIOD_THRESHOLD_S: f64 = 1.0;

/// Wind-speed delta below which the trend reads steady, mph.
const SPEED_THRESHOLD_MPH: f64 = 2.0;

/// Delta between the newest and oldest valid sample inside the window.
/// `None` with fewer than two valid samples.
fn window_delta<F>(rows: &[MetRow], extract: F) -> Option<f64>
where
    F: Fn(&MetRow) -> Option<f64>,
{
    let window = &rows[..rows.len().min(TREND_WINDOW)];
    let mut valid = window.iter().filter_map(|row| extract(row));

    let newest = valid.next()?;
    let oldest = valid.last()?;
    Some(newest - oldest)
}

/// Derive the three trend descriptors from rows ordered newest first.
pub fn derive_trend(rows: &[MetRow]) -> Trend {
    let wave_height = window_delta(rows, |r| r.wave_height.map(meters_to_feet)).map(|d| {
        if d.abs() < HEIGHT_THRESHOLD_FT {
            HeightTrend::Steady
        } else if d > 0.0 {
            HeightTrend::Building
        } else {
            HeightTrend::Dropping
        }
    });

    let wave_period = window_delta(rows, |r| r.dominant_period).map(|d| {
        if d.abs() < PERIOD_THRESHOLD_S {
            PeriodTrend::Steady
        } else if d > 0.0 {
            PeriodTrend::Lengthening
        } else {
            PeriodTrend::Shortening
        }
    });

    let wind_speed = window_delta(rows, |r| r.wind_speed.map(speed_to_mph)).map(|d| {
        if d.abs() < SPEED_THRESHOLD_MPH {
            SpeedTrend::Steady
        } else if d > 0.0 {
            SpeedTrend::Increasing
        } else {
            SpeedTrend::Decreasing
        }
    });

    Trend {
        wave_height,
        wave_period,
        wind_speed,
    }
}

/// Beaufort scale, keyed by upper-bound speed in mph.
const BEAUFORT: [(f64, &str, &str); 13] = [
    (1.0, "Calm", "Sea like a mirror"),
    (3.0, "Light Air", "Ripples without crests"),
    (7.0, "Light Breeze", "Small wavelets, glassy crests"),
    (12.0, "Gentle Breeze", "Large wavelets, crests begin to break"),
    (18.0, "Moderate Breeze", "Small waves with frequent whitecaps"),
    (24.0, "Fresh Breeze", "Moderate waves, many whitecaps, some spray"),
    (31.0, "Strong Breeze", "Large waves, extensive whitecaps"),
    (38.0, "Near Gale", "Sea heaps up, foam blown in streaks"),
    (46.0, "Gale", "Moderately high waves, breaking crests"),
    (54.0, "Strong Gale", "High waves, dense foam, reduced visibility"),
    (63.0, "Storm", "Very high waves with overhanging crests"),
    (72.0, "Violent Storm", "Exceptionally high waves, sea covered in foam"),
    (f64::INFINITY, "Hurricane", "Air filled with foam and spray, sea white"),
];

/// Look up the Beaufort category for a wind speed in mph.
pub fn wind_category(speed_mph: f64) -> WindCategory {
    let (_, name, seas) = BEAUFORT
        .iter()
        .find(|(upper, _, _)| speed_mph <= *upper)
        .unwrap_or(&BEAUFORT[BEAUFORT.len() - 1]);
    WindCategory { name, seas }
}

/// Classify which wave family dominates, from spectral component heights.
///
/// Swell-only when swell stands at least twice the wind wave (or the wind
/// wave is absent); the mirrored rule for wind-wave-only; mixed otherwise.
pub fn dominant_partition(
    swell_height: Option<f64>,
    wind_wave_height: Option<f64>,
) -> Option<DominantPartition> {
    match (swell_height, wind_wave_height) {
        (Some(sw), Some(ww)) => {
            if sw >= ww * 2.0 {
                Some(DominantPartition::SwellOnly)
            } else if ww >= sw * 2.0 {
                Some(DominantPartition::WindWaveOnly)
            } else {
                Some(DominantPartition::Mixed)
            }
        }
        (Some(_), None) => Some(DominantPartition::SwellOnly),
        (None, Some(_)) => Some(DominantPartition::WindWaveOnly),
        (None, None) => None,
    }
}

/// Compose the one-sentence mariner summary.
pub fn mariner_summary(
    partition: Option<DominantPartition>,
    category: Option<&WindCategory>,
) -> Option<String> {
    let category = category?;
    let seas = match partition {
        Some(DominantPartition::SwellOnly) => "Clean swell running",
        Some(DominantPartition::WindWaveOnly) => "Locally generated wind waves",
        Some(DominantPartition::Mixed) => "Mixed swell and wind waves",
        None => "Seas",
    };
    Some(format!(
        "{} under {} conditions ({}).",
        seas,
        category.name.to_lowercase(),
        category.seas.to_lowercase()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(minutes_ago: i64, wave_m: Option<f64>, period: Option<f64>, wind: Option<f64>) -> MetRow {
        MetRow {
            time: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
                - chrono::Duration::minutes(minutes_ago),
            wind_direction: None,
            wind_speed: wind,
            gust: None,
            wave_height: wave_m,
            dominant_period: period,
            average_period: None,
            wave_direction: None,
            pressure: None,
            air_temp: None,
            water_temp: None,
            dew_point: None,
        }
    }

    #[test]
    fn test_building_wave_trend() {
        // 2.1m newest vs 1.9m oldest: delta 0.2m = 0.66ft > 0.5ft
        let rows = vec![
            row(0, Some(2.1), None, None),
            row(30, Some(2.0), None, None),
            row(60, Some(1.9), None, None),
        ];
        assert_eq!(derive_trend(&rows).wave_height, Some(HeightTrend::Building));
    }

    #[test]
    fn test_steady_wave_trend() {
        // Delta 0.1m = 0.33ft < 0.5ft
        let rows = vec![row(0, Some(2.0), None, None), row(30, Some(1.9), None, None)];
        assert_eq!(derive_trend(&rows).wave_height, Some(HeightTrend::Steady));
    }

    #[test]
    fn test_dropping_uses_oldest_within_window() {
        // Nine rows: the oldest falls outside the 8-row window and must
        // not contribute.
        let mut rows: Vec<MetRow> = (0..8).map(|i| row(i * 30, Some(2.0), None, None)).collect();
        rows[0].wave_height = Some(1.5); // newest well below the rest
        rows.push(row(240, Some(0.1), None, None)); // outside window

        assert_eq!(derive_trend(&rows).wave_height, Some(HeightTrend::Dropping));
    }

    #[test]
    fn test_trend_absent_with_single_sample() {
        let rows = vec![
            row(0, Some(2.0), None, None),
            row(30, None, None, None),
        ];
        assert_eq!(derive_trend(&rows).wave_height, None);
    }

    #[test]
    fn test_period_trend_lengthening() {
        let rows = vec![
            row(0, None, Some(14.0), None),
            row(30, None, Some(12.0), None),
        ];
        assert_eq!(derive_trend(&rows).wave_period, Some(PeriodTrend::Lengthening));
    }

    #[test]
    fn test_wind_trend_from_wind_only_rows() {
        // All wave fields absent: the rows still contribute to wind trend.
        let rows = vec![
            row(0, None, None, Some(10.0)),
            row(30, None, None, Some(5.0)),
        ];
        let trend = derive_trend(&rows);
        assert_eq!(trend.wave_height, None);
        assert_eq!(trend.wind_speed, Some(SpeedTrend::Increasing));
    }

    #[test]
    fn test_wind_trend_steady_below_threshold() {
        // 1.0 raw unit = 1.15 mph < 2 mph
        let rows = vec![
            row(0, None, None, Some(8.0)),
            row(30, None, None, Some(7.0)),
        ];
        assert_eq!(derive_trend(&rows).wind_speed, Some(SpeedTrend::Steady));
    }

    #[test]
    fn test_beaufort_lookup() {
        assert_eq!(wind_category(0.5).name, "Calm");
        assert_eq!(wind_category(20.0).name, "Fresh Breeze");
        assert_eq!(wind_category(24.0).name, "Fresh Breeze");
        assert_eq!(wind_category(24.1).name, "Strong Breeze");
        assert_eq!(wind_category(100.0).name, "Hurricane");
    }

    #[test]
    fn test_dominant_partition_rules() {
        assert_eq!(
            dominant_partition(Some(2.0), Some(0.5)),
            Some(DominantPartition::SwellOnly)
        );
        assert_eq!(
            dominant_partition(Some(0.4), Some(1.2)),
            Some(DominantPartition::WindWaveOnly)
        );
        assert_eq!(
            dominant_partition(Some(1.0), Some(0.8)),
            Some(DominantPartition::Mixed)
        );
        assert_eq!(
            dominant_partition(Some(1.0), None),
            Some(DominantPartition::SwellOnly)
        );
        assert_eq!(dominant_partition(None, None), None);
    }

    #[test]
    fn test_mariner_summary() {
        let category = wind_category(20.0);
        let summary =
            mariner_summary(Some(DominantPartition::SwellOnly), Some(&category)).unwrap();
        assert_eq!(
            summary,
            "Clean swell running under fresh breeze conditions (moderate waves, many whitecaps, some spray)."
        );
    }

    #[test]
    fn test_mariner_summary_requires_wind() {
        assert_eq!(mariner_summary(Some(DominantPartition::Mixed), None), None);
    }
}
