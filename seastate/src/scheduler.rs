//! Refresh scheduler: drives prefetch cycles aligned to the forecast
//! cadence.
//!
//! On start the scheduler runs an immediate cold-fill cycle, then arms a
//! single timer for the next cycle's availability instant. A failed
//! cycle arms a short recovery timer instead. Cycles never overlap: the
//! next timer is armed only after the previous cycle has returned. On
//! shutdown the pending timer is cancelled and an in-flight cycle is
//! allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cadence::seconds_until_next_cycle_available;
use crate::config::CoreConfig;
use crate::prefetch::BulkPrefetcher;

/// Drives the bulk prefetcher on the forecast cycle cadence.
pub struct RefreshScheduler {
    prefetcher: Arc<BulkPrefetcher>,
    config: CoreConfig,
}

impl RefreshScheduler {
    pub fn new(prefetcher: Arc<BulkPrefetcher>, config: CoreConfig) -> Self {
        Self { prefetcher, config }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// The in-flight cycle is not interrupted by shutdown; only the
    /// pending timer is.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("refresh scheduler starting, running cold-fill cycle");

        loop {
            let delay = match self.prefetcher.run_cycle().await {
                Ok(snapshot) => {
                    let delay = Duration::from_secs(seconds_until_next_cycle_available(Utc::now()));
                    info!(
                        succeeded = snapshot.succeeded,
                        failed = snapshot.failed,
                        next_cycle_secs = delay.as_secs(),
                        "prefetch cycle finished, timer armed"
                    );
                    delay
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        recovery_secs = self.config.scheduler_recovery_delay.as_secs(),
                        "prefetch cycle failed, arming recovery timer"
                    );
                    self.config.scheduler_recovery_delay
                }
            };

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("refresh scheduler shutting down");
                    break;
                }

                _ = tokio::time::sleep(delay) => {}
            }

            if shutdown.is_cancelled() {
                info!("refresh scheduler shutting down");
                break;
            }
        }

        info!("refresh scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StationAggregator;
    use crate::buoy::BuoyFetcher;
    use crate::cache::TtlCache;
    use crate::error::CoreError;
    use crate::fetch::{HttpFetch, HttpResponse};
    use crate::forecast::ForecastFetcher;
    use crate::prefetch::SharedPrefetchStatus;
    use crate::station::StationCatalog;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CATALOG: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-122.4, 36.8]},
                "properties": {"id": "46042", "name": "Monterey Bay", "hasRealTimeData": true}
            }
        ]
    }"#;

    const MET: &str = "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP
2025 03 10 12 26 270  8.0 10.5   2.1  12.0   8.2 285 1015.2  14.1  13.5  10.2
";

    struct HappyMock {
        calls: AtomicUsize,
    }

    impl HttpFetch for HappyMock {
        fn get<'a>(
            &'a self,
            url: &'a str,
            _timeout: std::time::Duration,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, CoreError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = if url.ends_with(".txt") {
                MET.to_string()
            } else if url.ends_with(".spec") {
                String::new()
            } else {
                let mut body = String::from("htsgw, [56][1][1]\n");
                for step in 0..56 {
                    body.push_str(&format!("[{step}][0], 1.5\n"));
                }
                body
            };
            Box::pin(async move { Ok(HttpResponse { status: 200, body }) })
        }
    }

    fn build() -> (RefreshScheduler, Arc<SharedPrefetchStatus>) {
        let config = CoreConfig::default().with_retry_delay(Duration::from_millis(1));
        let catalog = Arc::new(StationCatalog::from_geojson(CATALOG).unwrap());
        let http = Arc::new(HappyMock {
            calls: AtomicUsize::new(0),
        }) as Arc<dyn HttpFetch>;
        let buoy = Arc::new(BuoyFetcher::new(
            Arc::clone(&http),
            config.ndbc_base.clone(),
            config.buoy_timeout,
        ));
        let forecast = Arc::new(ForecastFetcher::new(Arc::clone(&http), config.clone()));
        let aggregator = Arc::new(StationAggregator::new(
            config.clone(),
            Arc::clone(&catalog),
            Arc::new(TtlCache::new()),
            Arc::new(TtlCache::new()),
            Arc::new(TtlCache::new()),
            buoy,
            forecast,
        ));
        let status = SharedPrefetchStatus::new();
        let prefetcher = Arc::new(BulkPrefetcher::new(
            config.clone(),
            catalog,
            aggregator,
            Arc::clone(&status),
        ));
        (RefreshScheduler::new(prefetcher, config), status)
    }

    #[tokio::test]
    async fn test_cold_fill_runs_immediately() {
        let (scheduler, status) = build();
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        // The cold-fill cycle completes well before the first timer fires.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(status.snapshot().cycles_completed, 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_timer() {
        let (scheduler, _status) = build();
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(scheduler.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "pending timer must not block shutdown");
    }
}
