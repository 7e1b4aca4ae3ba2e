//! Buoy observation fetcher.
//!
//! Retrieves the meteorological and spectral realtime products for a
//! station in parallel, parses them, and derives trend, wind category,
//! and the mariner summary. The spectral product is optional upstream;
//! its absence never fails the fetch. No retries here: the caller's
//! deadline is short and fresh data will not appear within a retry
//! window.

mod parser;
mod trend;
mod types;

pub use parser::{parse_met, parse_spectral, MetRow, SpectralRow};
pub use trend::{derive_trend, dominant_partition, mariner_summary, wind_category, TREND_WINDOW};
pub use types::{
    meters_to_feet, speed_to_mph, Atmosphere, DataAge, DominantPartition, HeightTrend,
    Observation, PeriodTrend, SpectralComponent, SpectralSummary, SpeedTrend, Trend, Waves, Wind,
    WindCategory,
};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::fetch::HttpFetch;

/// Minutes after which an observation counts as stale.
const STALE_AFTER_MINUTES: f64 = 45.0;

/// Fetches and assembles station observations.
pub struct BuoyFetcher {
    http: Arc<dyn HttpFetch>,
    base_url: String,
    timeout: Duration,
}

impl BuoyFetcher {
    /// Create a fetcher against the given realtime base URL.
    pub fn new(http: Arc<dyn HttpFetch>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Fetch the latest observation for a station.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable`/`Timeout` when the meteorological product
    /// cannot be retrieved; `NoData` when it parses to zero usable rows.
    pub async fn fetch(&self, station_id: &str) -> Result<Observation, CoreError> {
        let met_url = format!("{}/{}.txt", self.base_url, station_id);
        let spec_url = format!("{}/{}.spec", self.base_url, station_id);

        let (met, spectral) = tokio::join!(
            self.http.get(&met_url, self.timeout),
            self.http.get(&spec_url, self.timeout),
        );

        let met = met?;
        if !met.is_success() {
            return Err(CoreError::UpstreamUnavailable(format!(
                "observation fetch for {station_id} returned HTTP {}",
                met.status
            )));
        }
        let rows = parse_met(station_id, &met.body)?;

        let spectral_row = match spectral {
            Ok(response) if response.is_success() => parse_spectral(&response.body),
            Ok(response) if response.status == 404 => {
                debug!(station_id, "no spectral product for station");
                None
            }
            Ok(response) => {
                warn!(station_id, status = response.status, "spectral fetch failed");
                None
            }
            Err(err) => {
                warn!(station_id, error = %err, "spectral fetch failed");
                None
            }
        };

        Ok(assemble_observation(&rows, spectral_row.as_ref()))
    }
}

/// Build the observation from parsed rows (newest first) and the optional
/// spectral row. Conversions to presentation units happen here.
///
/// `rows` must be non-empty; `parse_met` never returns an empty set.
pub fn assemble_observation(rows: &[MetRow], spectral: Option<&SpectralRow>) -> Observation {
    let newest = &rows[0];

    let wind = Wind {
        direction: newest.wind_direction.map(|d| d.rem_euclid(360.0)),
        speed: newest.wind_speed.map(speed_to_mph),
        gust: newest.gust.map(speed_to_mph),
    };

    let spectral_summary = spectral.map(|row| SpectralSummary {
        swell: component(row.swell_height, row.swell_period, row.swell_direction.clone()),
        wind_wave: component(
            row.wind_wave_height,
            row.wind_wave_period,
            row.wind_wave_direction.clone(),
        ),
        steepness: row.steepness.clone(),
        mean_direction: row.mean_direction,
    });

    let waves = Waves {
        height: newest.wave_height.map(meters_to_feet),
        dominant_period: newest.dominant_period,
        average_period: newest.average_period,
        direction: newest.wave_direction.map(|d| d.rem_euclid(360.0)),
        spectral: spectral_summary,
    };

    let atmosphere = Atmosphere {
        pressure: newest.pressure,
        air_temp: newest.air_temp,
        water_temp: newest.water_temp,
        dew_point: newest.dew_point,
    };

    let trend = Some(derive_trend(rows)).filter(|t| !t.is_empty());

    let category = wind.speed.map(wind_category);
    let partition = spectral.and_then(|row| {
        dominant_partition(row.swell_height, row.wind_wave_height)
    });
    let summary = mariner_summary(partition, category.as_ref());

    let age_minutes = (Utc::now() - newest.time).num_seconds() as f64 / 60.0;

    Observation {
        time: newest.time,
        wind,
        waves,
        atmosphere,
        trend,
        wind_category: category,
        dominant_partition: partition,
        summary,
        data_age: DataAge {
            minutes: (age_minutes * 10.0).round() / 10.0,
            is_stale: age_minutes > STALE_AFTER_MINUTES,
        },
    }
}

fn component(
    height: Option<f64>,
    period: Option<f64>,
    direction: Option<String>,
) -> Option<SpectralComponent> {
    if height.is_none() && period.is_none() && direction.is_none() {
        return None;
    }
    Some(SpectralComponent {
        height: height.map(meters_to_feet),
        period,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpResponse;
    use std::future::Future;
    use std::pin::Pin;

    /// Mock that routes by URL suffix.
    struct RoutedClient {
        met: Result<HttpResponse, CoreError>,
        spectral: Result<HttpResponse, CoreError>,
    }

    impl HttpFetch for RoutedClient {
        fn get<'a>(
            &'a self,
            url: &'a str,
            _timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, CoreError>> + Send + 'a>> {
            let response = if url.ends_with(".txt") {
                self.met.clone()
            } else {
                self.spectral.clone()
            };
            Box::pin(async move { response })
        }
    }

    const MET: &str = "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP
2025 03 10 12 26 270  8.0 10.5   2.1  12.0   8.2 285 1015.2  14.1  13.5  10.2
2025 03 10 11 56 265  7.5  9.8   1.9  11.0   8.0 280 1015.0  14.0  13.5  10.0
";

    const SPEC: &str = "\
#YY  MM DD hh mm WVHT  SwH  SwP  WWH  WWP SwD WWD  STEEPNESS  APD MWD
2025 03 10 12 26  2.1  1.8 12.9  0.5  5.0 WNW WSW    AVERAGE  8.2 285
";

    fn ok(body: &str) -> Result<HttpResponse, CoreError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> Result<HttpResponse, CoreError> {
        Ok(HttpResponse {
            status: code,
            body: String::new(),
        })
    }

    fn fetcher(met: Result<HttpResponse, CoreError>, spectral: Result<HttpResponse, CoreError>) -> BuoyFetcher {
        BuoyFetcher::new(
            Arc::new(RoutedClient { met, spectral }),
            "http://ndbc.test/realtime2",
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_fetch_with_spectral() {
        let observation = fetcher(ok(MET), ok(SPEC)).fetch("46042").await.unwrap();

        // 2.1 m -> 6.89 ft
        let height = observation.waves.height.unwrap();
        assert!((height - 6.889764).abs() < 1e-3);
        // 8.0 upstream units -> 9.2 mph
        let speed = observation.wind.speed.unwrap();
        assert!((speed - 9.20624).abs() < 1e-3);

        let spectral = observation.waves.spectral.unwrap();
        assert_eq!(spectral.steepness.as_deref(), Some("AVERAGE"));
        assert_eq!(
            observation.dominant_partition,
            Some(DominantPartition::SwellOnly)
        );
        assert!(observation.summary.unwrap().contains("swell"));
    }

    #[tokio::test]
    async fn test_fetch_spectral_404_is_not_an_error() {
        let observation = fetcher(ok(MET), status(404)).fetch("46042").await.unwrap();
        assert!(observation.waves.spectral.is_none());
        assert_eq!(observation.dominant_partition, None);
        // Summary still renders from the wind category alone.
        assert!(observation.summary.is_some());
    }

    #[tokio::test]
    async fn test_fetch_met_failure_is_upstream() {
        let err = fetcher(status(503), ok(SPEC)).fetch("46042").await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_met_network_error_propagates() {
        let err = fetcher(
            Err(CoreError::Timeout("slow".into())),
            ok(SPEC),
        )
        .fetch("46042")
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_fetch_empty_met_is_nodata() {
        let err = fetcher(ok("# headers\n"), status(404))
            .fetch("46042")
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::NoData("46042".to_string()));
    }

    #[tokio::test]
    async fn test_trend_present_with_two_rows() {
        let observation = fetcher(ok(MET), status(404)).fetch("46042").await.unwrap();
        let trend = observation.trend.unwrap();
        // 2.1 vs 1.9 m: 0.66 ft delta -> building
        assert_eq!(trend.wave_height, Some(HeightTrend::Building));
        assert_eq!(trend.wave_period, Some(PeriodTrend::Lengthening));
    }

    #[test]
    fn test_assemble_normalizes_directions() {
        let mut rows = parse_met("x", MET).unwrap();
        rows[0].wind_direction = Some(370.0);
        let observation = assemble_observation(&rows, None);
        assert_eq!(observation.wind.direction, Some(10.0));
    }
}
