//! Bulk prefetcher: keeps the cache warm for the whole catalogue.
//!
//! Stations are swept in waves of `batch_size × concurrent_batches`
//! concurrent fills with a mandatory pause between waves, giving the
//! upstream producers backpressure. Fills whose planned TTL is about to
//! lapse anyway are skipped. Partial success is the normal outcome and
//! is reflected in the shared status.

mod status;

pub use status::{PrefetchFailure, PrefetchSnapshot, SharedPrefetchStatus};

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::aggregator::StationAggregator;
use crate::cadence::{seconds_until_next_cycle_available, seconds_until_next_observation};
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::station::{Station, StationCatalog};

/// Sweeps the catalogue, filling caches ahead of client requests.
pub struct BulkPrefetcher {
    config: CoreConfig,
    catalog: Arc<StationCatalog>,
    aggregator: Arc<StationAggregator>,
    status: Arc<SharedPrefetchStatus>,
}

impl BulkPrefetcher {
    pub fn new(
        config: CoreConfig,
        catalog: Arc<StationCatalog>,
        aggregator: Arc<StationAggregator>,
        status: Arc<SharedPrefetchStatus>,
    ) -> Self {
        Self {
            config,
            catalog,
            aggregator,
            status,
        }
    }

    /// Run one full prefetch cycle over the grid-covered catalogue.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` only when every station in a non-empty
    /// cycle failed; the producers are down and the scheduler should
    /// back off. Partial failure is success.
    pub async fn run_cycle(&self) -> Result<PrefetchSnapshot, CoreError> {
        let eligible: Vec<Station> = self
            .catalog
            .iter()
            .filter(|s| s.in_grid)
            .cloned()
            .collect();

        info!(stations = eligible.len(), "prefetch cycle starting");
        self.status.begin_cycle(eligible.len());

        let wave_size = self.config.prefetch_batch_size * self.config.prefetch_concurrent_batches;
        let waves: Vec<&[Station]> = eligible.chunks(wave_size.max(1)).collect();
        let wave_count = waves.len();

        for (index, wave) in waves.into_iter().enumerate() {
            let batches = wave.chunks(self.config.prefetch_batch_size.max(1));
            join_all(batches.map(|batch| async move {
                join_all(batch.iter().map(|station| self.prefetch_station(station))).await
            }))
            .await;

            if index + 1 < wave_count {
                tokio::time::sleep(self.config.prefetch_wave_pause).await;
            }
        }

        self.status.complete_cycle(Utc::now());
        let snapshot = self.status.snapshot();
        info!(
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            skipped = snapshot.skipped,
            "prefetch cycle complete"
        );

        if snapshot.total > 0 && snapshot.failed == snapshot.total {
            return Err(CoreError::UpstreamUnavailable(
                "prefetch cycle failed for every station".into(),
            ));
        }
        Ok(snapshot)
    }

    async fn prefetch_station(&self, station: &Station) {
        let now = Utc::now();
        let min_ttl = self.config.prefetch_min_ttl.as_secs();

        // A fill whose value lapses within the skip window is wasted work.
        if seconds_until_next_observation(now) < min_ttl
            || seconds_until_next_cycle_available(now) < min_ttl
        {
            debug!(station_id = %station.id, "skipping prefetch, planned TTL too short");
            self.status.record_skip();
            return;
        }

        match self.aggregator.get_station(&station.id).await {
            Ok(_) => self.status.record_success(),
            Err(err) => {
                warn!(station_id = %station.id, error = %err, "prefetch failed");
                self.status.record_failure(&station.id, err.to_string());
            }
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> PrefetchSnapshot {
        self.status.snapshot()
    }
}
