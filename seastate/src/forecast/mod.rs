//! Wave-model forecast fetcher.
//!
//! Resolves a point through the grid router, targets the latest available
//! model run, and pulls all nineteen forecast variables for the point's
//! grid cell in a single request.

mod parser;
mod types;

pub use parser::{parse_ascii, sample, VariableSeries};
pub use types::{
    Forecast, ForecastCycle, ForecastPeriod, ForecastWind, GridLocation, WavePartition,
};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::buoy::{meters_to_feet, speed_to_mph};
use crate::cadence::{latest_available_cycle, ModelRun};
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::fetch::{HttpFetch, HttpResponse};
use crate::grid::{locate, normalize_longitude, GridCell};

/// The forecast variables requested from the model, in request order.
pub const FORECAST_VARIABLES: [&str; 19] = [
    "htsgw", "perpw", "dirpw", // primary wave
    "wvhgt", "wvper", "wvdir", // wind wave
    "swell_1", "swell_2", "swell_3", // swell heights
    "swper_1", "swper_2", "swper_3", // swell periods
    "swdir_1", "swdir_2", "swdir_3", // swell directions
    "wind", "wdir", "ugrd", "vgrd", // wind
];

/// Fetches and assembles point forecasts.
pub struct ForecastFetcher {
    http: Arc<dyn HttpFetch>,
    config: CoreConfig,
}

enum Attempt {
    Done(VariableSeries),
    Transient(CoreError),
    Fatal(CoreError),
}

impl ForecastFetcher {
    /// Create a fetcher using the shared HTTP client and core config.
    pub fn new(http: Arc<dyn HttpFetch>, config: CoreConfig) -> Self {
        Self { http, config }
    }

    /// Build the request URL for a grid cell and model run.
    ///
    /// Every variable carries the same index window
    /// `[0:<steps-1>][row][col]`, URL-encoded.
    pub fn request_url(&self, cell: &GridCell, run: &ModelRun) -> String {
        let last_step = self.config.forecast_periods() - 1;
        let varspec: Vec<String> = FORECAST_VARIABLES
            .iter()
            .map(|name| {
                format!(
                    "{name}%5B0:{last_step}%5D%5B{row}%5D%5B{col}%5D",
                    row = cell.row,
                    col = cell.col
                )
            })
            .collect();

        format!(
            "{base}/{date}/gfswave.{model}_{hour}z.ascii?{vars}",
            base = self.config.nomads_base,
            date = run.yyyymmdd(),
            model = cell.model.name,
            hour = run.cycle_str(),
            vars = varspec.join(",")
        )
    }

    /// Fetch the forecast for a point at clock time `now`.
    ///
    /// # Errors
    ///
    /// `OutOfGrid` when no model covers the point; `UpstreamUnavailable`
    /// or `Timeout` after the retry budget is spent; `Internal` on a 4xx
    /// other than 404 or an unusable well-formed response.
    pub async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Result<Forecast, CoreError> {
        let cell = locate(lat, lon)?;
        let run = latest_available_cycle(now);
        let url = self.request_url(&cell, &run);
        let steps = self.config.forecast_periods();

        let mut last_error = CoreError::UpstreamUnavailable("forecast fetch failed".into());

        for attempt in 1..=self.config.max_retries {
            match self.attempt(&url, steps).await {
                Attempt::Done(series) => {
                    let forecast = assemble_forecast(
                        &cell,
                        &run,
                        lat,
                        lon,
                        &series,
                        steps,
                        self.config.period_hours,
                    )?;
                    debug!(
                        model = cell.model.name,
                        run = %run,
                        periods = forecast.periods.len(),
                        "forecast assembled"
                    );
                    return Ok(forecast);
                }
                Attempt::Fatal(err) => return Err(err),
                Attempt::Transient(err) => {
                    warn!(
                        attempt,
                        max = self.config.max_retries,
                        error = %err,
                        "transient forecast failure"
                    );
                    last_error = err;
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn attempt(&self, url: &str, steps: usize) -> Attempt {
        let response = match self.http.get(url, self.config.request_timeout).await {
            Ok(response) => response,
            Err(err) if err.is_transient() => return Attempt::Transient(err),
            Err(err) => return Attempt::Fatal(err),
        };

        classify_response(response, steps)
    }
}

fn classify_response(response: HttpResponse, steps: usize) -> Attempt {
    if response.status == 404 {
        return Attempt::Fatal(CoreError::UpstreamUnavailable(
            "model run not present upstream (404)".into(),
        ));
    }
    if response.is_server_error() {
        return Attempt::Transient(CoreError::UpstreamUnavailable(format!(
            "upstream returned HTTP {}",
            response.status
        )));
    }
    if !response.is_success() {
        return Attempt::Fatal(CoreError::Internal(format!(
            "unexpected HTTP {} from forecast endpoint",
            response.status
        )));
    }
    if response.body.trim().is_empty() {
        return Attempt::Transient(CoreError::UpstreamUnavailable(
            "empty forecast response body".into(),
        ));
    }

    Attempt::Done(parse_ascii(&response.body, steps))
}

/// Assemble periods from parsed series. A period exists only where the
/// primary wave height was sampled.
#[allow(clippy::too_many_arguments)]
fn assemble_forecast(
    cell: &GridCell,
    run: &ModelRun,
    lat: f64,
    lon: f64,
    series: &VariableSeries,
    steps: usize,
    period_hours: u32,
) -> Result<Forecast, CoreError> {
    let base_time = run.run_datetime();
    let mut periods = Vec::new();

    for step in 0..steps {
        let Some(height_m) = sample(series, "htsgw", step) else {
            continue;
        };

        let swell = (1..=3)
            .filter_map(|n| {
                partition(
                    sample(series, &format!("swell_{n}"), step),
                    sample(series, &format!("swper_{n}"), step),
                    sample(series, &format!("swdir_{n}"), step),
                )
            })
            .collect();

        periods.push(ForecastPeriod {
            time: base_time + chrono::Duration::hours(period_hours as i64 * step as i64),
            waves: WavePartition {
                height_m,
                height_ft: meters_to_feet(height_m),
                period: sample(series, "perpw", step),
                direction: sample(series, "dirpw", step).map(|d| d.rem_euclid(360.0)),
            },
            wind_wave: partition(
                sample(series, "wvhgt", step),
                sample(series, "wvper", step),
                sample(series, "wvdir", step),
            ),
            swell,
            wind: ForecastWind {
                speed: sample(series, "wind", step).map(speed_to_mph),
                direction: sample(series, "wdir", step).map(|d| d.rem_euclid(360.0)),
                u: sample(series, "ugrd", step),
                v: sample(series, "vgrd", step),
            },
        });
    }

    if periods.is_empty() {
        return Err(CoreError::Internal(
            "forecast response contained no usable periods".into(),
        ));
    }

    Ok(Forecast {
        model: cell.model.name.to_string(),
        cycle: ForecastCycle {
            date: run.yyyymmdd(),
            hour: run.cycle_str(),
        },
        location: GridLocation {
            lat,
            lon: normalize_longitude(lon),
            row: cell.row,
            col: cell.col,
        },
        periods,
    })
}

fn partition(
    height_m: Option<f64>,
    period: Option<f64>,
    direction: Option<f64>,
) -> Option<WavePartition> {
    let height_m = height_m?;
    Some(WavePartition {
        height_m,
        height_ft: meters_to_feet(height_m),
        period,
        direction: direction.map(|d| d.rem_euclid(360.0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock that replays a scripted sequence of outcomes.
    struct SequencedClient {
        responses: Mutex<Vec<Result<HttpResponse, CoreError>>>,
        calls: AtomicUsize,
    }

    impl SequencedClient {
        fn new(responses: Vec<Result<HttpResponse, CoreError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl HttpFetch for SequencedClient {
        fn get<'a>(
            &'a self,
            _url: &'a str,
            _timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, CoreError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let response = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            Box::pin(async move { response })
        }
    }

    fn body_with_heights() -> String {
        let mut body = String::from("htsgw, [56][1][1]\n");
        for step in 0..56 {
            body.push_str(&format!("[{step}][0], 1.5\n"));
        }
        body.push_str("\nperpw, [56][1][1]\n[0][0], 12.0\n");
        body.push_str("\nswell_1, [56][1][1]\n[0][0], 1.2\n");
        body.push_str("\nswper_1, [56][1][1]\n[0][0], 14.0\n");
        body.push_str("\nwind, [56][1][1]\n[0][0], 5.0\n");
        body
    }

    fn ok(body: String) -> Result<HttpResponse, CoreError> {
        Ok(HttpResponse { status: 200, body })
    }

    fn status(code: u16) -> Result<HttpResponse, CoreError> {
        Ok(HttpResponse {
            status: code,
            body: String::new(),
        })
    }

    fn fetcher(client: SequencedClient) -> ForecastFetcher {
        fetcher_with(Arc::new(client))
    }

    fn fetcher_with(client: Arc<SequencedClient>) -> ForecastFetcher {
        let config = CoreConfig::default().with_retry_delay(Duration::from_millis(1));
        ForecastFetcher::new(client as Arc<dyn HttpFetch>, config)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_request_url_worked_example() {
        let fetcher = fetcher(SequencedClient::new(vec![status(200)]));
        let cell = locate(33.0, -117.5).unwrap();
        let run = ModelRun {
            date: chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            cycle: 6,
        };

        let url = fetcher.request_url(&cell, &run);
        assert!(url.starts_with(
            "https://nomads.ncep.noaa.gov/dods/wave/gfswave/20250310/gfswave.wcoast.0p16_06z.ascii?"
        ));
        // Every variable addresses the same cell with the full window.
        assert_eq!(url.matches("%5B0:55%5D%5B48%5D%5B195%5D").count(), 19);
        for name in FORECAST_VARIABLES {
            assert!(url.contains(name), "missing variable {name}");
        }
    }

    #[tokio::test]
    async fn test_fetch_assembles_periods() {
        let forecast = fetcher(SequencedClient::new(vec![ok(body_with_heights())]))
            .fetch(33.0, -117.5, noon())
            .await
            .unwrap();

        assert_eq!(forecast.model, "wcoast.0p16");
        assert_eq!(forecast.periods.len(), 56);
        // 12:00 UTC on 2025-03-10: latest cycle is 06z (available 11:00).
        assert_eq!(forecast.cycle.hour, "06");

        let first = &forecast.periods[0];
        assert_eq!(
            first.time,
            Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap()
        );
        assert_eq!(first.waves.height_m, 1.5);
        assert_eq!(first.swell.len(), 1);
        assert_eq!(first.swell[0].period, Some(14.0));
        assert!(first.wind.speed.is_some());

        // Second period has height only: no partitions survive.
        let second = &forecast.periods[1];
        assert_eq!(
            second.time,
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
        );
        assert!(second.swell.is_empty());
        assert_eq!(second.waves.period, None);
    }

    #[tokio::test]
    async fn test_fetch_out_of_grid() {
        let err = fetcher(SequencedClient::new(vec![ok(body_with_heights())]))
            .fetch(21.67, -158.12, noon())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfGrid { .. }));
    }

    #[tokio::test]
    async fn test_fetch_retries_on_5xx_then_succeeds() {
        let client = SequencedClient::new(vec![
            status(502),
            status(503),
            ok(body_with_heights()),
        ]);
        let forecast = fetcher(client).fetch(33.0, -117.5, noon()).await.unwrap();
        assert_eq!(forecast.periods.len(), 56);
    }

    #[tokio::test]
    async fn test_fetch_exhausts_retries_on_persistent_5xx() {
        let client = Arc::new(SequencedClient::new(vec![status(502)]));
        let err = fetcher_with(Arc::clone(&client))
            .fetch(33.0, -117.5, noon())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_404_fails_without_retry() {
        let client = Arc::new(SequencedClient::new(vec![status(404)]));
        let err = fetcher_with(Arc::clone(&client))
            .fetch(33.0, -117.5, noon())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_other_4xx_is_internal() {
        let client = Arc::new(SequencedClient::new(vec![status(403)]));
        let err = fetcher_with(Arc::clone(&client))
            .fetch(33.0, -117.5, noon())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Internal(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_empty_body_is_transient() {
        let client = SequencedClient::new(vec![
            ok(String::new()),
            ok(body_with_heights()),
        ]);
        let forecast = fetcher(client).fetch(33.0, -117.5, noon()).await.unwrap();
        assert_eq!(forecast.periods.len(), 56);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_transient() {
        let client = SequencedClient::new(vec![
            Err(CoreError::Timeout("slow".into())),
            ok(body_with_heights()),
        ]);
        let forecast = fetcher(client).fetch(33.0, -117.5, noon()).await.unwrap();
        assert_eq!(forecast.periods.len(), 56);
    }

    #[tokio::test]
    async fn test_fetch_no_heights_is_internal() {
        let client = SequencedClient::new(vec![ok("perpw, [56][1][1]\n[0][0], 12.0\n".into())]);
        let err = fetcher(client)
            .fetch(33.0, -117.5, noon())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
