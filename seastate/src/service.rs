//! Explicit service wiring.
//!
//! `CoreServices` is constructed once at startup and passed down; the
//! operational surfaces (health, purge, status) read it through
//! accessors. There is no module-scoped global state.

use std::sync::Arc;

use serde::Serialize;

use crate::aggregator::StationAggregator;
use crate::buoy::{BuoyFetcher, Observation};
use crate::cache::{CacheStatsSnapshot, TtlCache};
use crate::config::CoreConfig;
use crate::envelope::Envelope;
use crate::error::CoreError;
use crate::fetch::{HttpFetch, SharedHttpClient};
use crate::forecast::{Forecast, ForecastFetcher};
use crate::prefetch::{BulkPrefetcher, PrefetchSnapshot, SharedPrefetchStatus};
use crate::scheduler::RefreshScheduler;
use crate::station::{Station, StationCatalog};

/// Readiness plus operational counters for the health surface.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub ready: bool,
    pub stations: usize,
    pub stations_in_grid: usize,
    pub prefetch: PrefetchSnapshot,
    pub observation_cache: CacheStatsSnapshot,
    pub forecast_cache: CacheStatsSnapshot,
    pub envelope_cache: CacheStatsSnapshot,
}

/// Everything the core needs, wired together once.
pub struct CoreServices {
    config: CoreConfig,
    catalog: Arc<StationCatalog>,
    observations: Arc<TtlCache<Observation>>,
    forecasts: Arc<TtlCache<Forecast>>,
    envelopes: Arc<TtlCache<Envelope>>,
    aggregator: Arc<StationAggregator>,
    prefetcher: Arc<BulkPrefetcher>,
    status: Arc<SharedPrefetchStatus>,
}

impl CoreServices {
    /// Wire the services against the real upstream HTTP client.
    pub fn new(config: CoreConfig, catalog: StationCatalog) -> Result<Self, CoreError> {
        let http = Arc::new(SharedHttpClient::new(config.http_pool_idle_timeout)?);
        Ok(Self::with_http(config, catalog, http))
    }

    /// Wire the services with an injected HTTP seam (tests).
    pub fn with_http(
        config: CoreConfig,
        catalog: StationCatalog,
        http: Arc<dyn HttpFetch>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let observations = Arc::new(TtlCache::new());
        let forecasts = Arc::new(TtlCache::new());
        let envelopes = Arc::new(TtlCache::new());

        let buoy = Arc::new(BuoyFetcher::new(
            Arc::clone(&http),
            config.ndbc_base.clone(),
            config.buoy_timeout,
        ));
        let forecast = Arc::new(ForecastFetcher::new(Arc::clone(&http), config.clone()));

        let aggregator = Arc::new(StationAggregator::new(
            config.clone(),
            Arc::clone(&catalog),
            Arc::clone(&observations),
            Arc::clone(&forecasts),
            Arc::clone(&envelopes),
            buoy,
            forecast,
        ));

        let status = SharedPrefetchStatus::new();
        let prefetcher = Arc::new(BulkPrefetcher::new(
            config.clone(),
            Arc::clone(&catalog),
            Arc::clone(&aggregator),
            Arc::clone(&status),
        ));

        Self {
            config,
            catalog,
            observations,
            forecasts,
            envelopes,
            aggregator,
            prefetcher,
            status,
        }
    }

    /// The merged envelope for one station.
    pub async fn get_station(&self, station_id: &str) -> Result<Envelope, CoreError> {
        self.aggregator.get_station(station_id).await
    }

    /// Full catalogue as GeoJSON.
    pub fn stations_geojson(&self) -> serde_json::Value {
        self.catalog.to_geojson()
    }

    /// Geographically closest station with its distance in kilometers.
    pub fn nearest_station(&self, lat: f64, lon: f64) -> Option<(&Station, f64)> {
        self.catalog.nearest(lat, lon)
    }

    /// The station catalogue.
    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    /// Current prefetch status snapshot.
    pub fn prefetch_status(&self) -> PrefetchSnapshot {
        self.status.snapshot()
    }

    /// Operational escape hatch: drop every cached entry.
    pub fn purge_caches(&self) {
        self.observations.purge();
        self.forecasts.purge();
        self.envelopes.purge();
    }

    /// Readiness and counters for the health surface.
    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            ready: true,
            stations: self.catalog.len(),
            stations_in_grid: self.catalog.iter().filter(|s| s.in_grid).count(),
            prefetch: self.status.snapshot(),
            observation_cache: self.observations.stats(),
            forecast_cache: self.forecasts.stats(),
            envelope_cache: self.envelopes.stats(),
        }
    }

    /// Build the refresh scheduler over these services.
    pub fn scheduler(&self) -> RefreshScheduler {
        RefreshScheduler::new(Arc::clone(&self.prefetcher), self.config.clone())
    }

    /// Run one prefetch cycle directly (operational use).
    pub async fn run_prefetch_cycle(&self) -> Result<PrefetchSnapshot, CoreError> {
        self.prefetcher.run_cycle().await
    }
}
