//! Station aggregator: composes the per-station envelope.
//!
//! Serves entirely from the envelope cache when possible; on a miss the
//! buoy and forecast halves are fetched concurrently through their own
//! cache entries, each under a hard deadline. The buoy half is
//! first-fatal-wins; the forecast half degrades to an error stub.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::buoy::{BuoyFetcher, Observation};
use crate::cache::{envelope_key, forecast_key, observation_key, TtlCache};
use crate::cadence::{seconds_until_next_cycle_available, seconds_until_next_observation};
use crate::config::CoreConfig;
use crate::envelope::{Envelope, ForecastOutcome};
use crate::error::CoreError;
use crate::forecast::{Forecast, ForecastFetcher};
use crate::station::{Station, StationCatalog};

/// Aggregates observation and forecast into envelopes, consulting the
/// cache store for both.
pub struct StationAggregator {
    config: CoreConfig,
    catalog: Arc<StationCatalog>,
    observations: Arc<TtlCache<Observation>>,
    forecasts: Arc<TtlCache<Forecast>>,
    envelopes: Arc<TtlCache<Envelope>>,
    buoy: Arc<BuoyFetcher>,
    forecast: Arc<ForecastFetcher>,
}

impl StationAggregator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoreConfig,
        catalog: Arc<StationCatalog>,
        observations: Arc<TtlCache<Observation>>,
        forecasts: Arc<TtlCache<Forecast>>,
        envelopes: Arc<TtlCache<Envelope>>,
        buoy: Arc<BuoyFetcher>,
        forecast: Arc<ForecastFetcher>,
    ) -> Self {
        Self {
            config,
            catalog,
            observations,
            forecasts,
            envelopes,
            buoy,
            forecast,
        }
    }

    /// Return the merged envelope for a station.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown stations or stations with no observation
    /// data; `UpstreamUnavailable`/`Timeout` when the buoy half fails.
    /// Forecast failures do not fail the request.
    pub async fn get_station(&self, station_id: &str) -> Result<Envelope, CoreError> {
        let station = self
            .catalog
            .get(station_id)
            .ok_or_else(|| CoreError::NotFound(station_id.to_string()))?
            .clone();

        if let Some(envelope) = self.envelopes.get(&envelope_key(station_id)) {
            debug!(station_id, "envelope served from cache");
            return Ok(envelope);
        }

        self.fill_station(&station).await
    }

    /// The cache-filling path: fetch both halves, compose, cache.
    /// Used on request misses and by the bulk prefetcher.
    pub async fn fill_station(&self, station: &Station) -> Result<Envelope, CoreError> {
        let now = Utc::now();
        let obs_ttl = self
            .config
            .clamp_ttl(Duration::from_secs(seconds_until_next_observation(now)));
        let fcst_ttl = self
            .config
            .clamp_ttl(Duration::from_secs(seconds_until_next_cycle_available(now)));

        let obs_key = observation_key(&station.id);
        let fcst_key = forecast_key(station.lat, station.lon);

        let obs_future = self.observations.get_or_fill(
            &obs_key,
            obs_ttl,
            deadline(
                self.config.buoy_deadline,
                "buoy fetch",
                self.buoy.fetch(&station.id),
            ),
        );

        let (obs_result, fcst_result) = if station.in_grid {
            let fcst_future = self.forecasts.get_or_fill(
                &fcst_key,
                fcst_ttl,
                deadline(
                    self.config.forecast_deadline,
                    "forecast fetch",
                    self.forecast.fetch(station.lat, station.lon, now),
                ),
            );
            let (obs, fcst) = tokio::join!(obs_future, fcst_future);
            (obs, Some(fcst))
        } else {
            (obs_future.await, None)
        };

        let observation = match obs_result {
            Ok(observation) => observation,
            Err(CoreError::NoData(id)) => return Err(CoreError::NotFound(id)),
            Err(err) => return Err(err),
        };

        let forecast = fcst_result.map(|result| match result {
            Ok(forecast) => ForecastOutcome::Data(forecast),
            Err(err) => {
                warn!(station_id = %station.id, error = %err, "serving envelope without forecast");
                ForecastOutcome::Failed {
                    error: (&err).into(),
                }
            }
        });

        // Out-of-grid envelopes have only one parent TTL.
        let env_ttl = if forecast.is_some() {
            obs_ttl.min(fcst_ttl)
        } else {
            obs_ttl
        };

        let envelope = Envelope::compose(station, Some(observation), forecast, Utc::now());
        self.envelopes
            .put(envelope_key(&station.id), envelope.clone(), env_ttl);

        Ok(envelope)
    }
}

/// Wrap a fetch in a hard deadline; on expiry the in-flight producer is
/// dropped and the fill slot is released without caching.
async fn deadline<T>(
    limit: Duration,
    what: &'static str,
    future: impl std::future::Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout(format!(
            "{what} exceeded {}s deadline",
            limit.as_secs()
        ))),
    }
}
