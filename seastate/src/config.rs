//! Core configuration.
//!
//! All knobs the refresh core honours, with the production defaults baked
//! into `Default`. The CLI may override individual values through the
//! builder-style setters; nothing here reads files or the environment.

use std::time::Duration;

/// Default NDBC realtime observation base URL.
pub const DEFAULT_NDBC_BASE: &str = "https://www.ndbc.noaa.gov/data/realtime2";

/// Default NOMADS wave-model base URL (dods ascii endpoint).
pub const DEFAULT_NOMADS_BASE: &str = "https://nomads.ncep.noaa.gov/dods/wave/gfswave";

/// Configuration for the refresh-and-caching core.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Forecast horizon in days.
    pub forecast_days: u32,
    /// Forecast periods per day.
    pub periods_per_day: u32,
    /// Hours between forecast periods.
    pub period_hours: u32,

    /// Forecast request timeout.
    pub request_timeout: Duration,
    /// Maximum forecast fetch attempts.
    pub max_retries: u32,
    /// Pause between forecast retries.
    pub retry_delay: Duration,

    /// Per-call timeout for buoy fetches.
    pub buoy_timeout: Duration,
    /// Hard deadline for the buoy half of a request.
    pub buoy_deadline: Duration,
    /// Hard deadline for the forecast half of a request.
    pub forecast_deadline: Duration,

    /// Ceiling for any computed cache TTL.
    pub cache_ceiling: Duration,

    /// Stations per prefetch batch.
    pub prefetch_batch_size: usize,
    /// Concurrent batches per prefetch wave.
    pub prefetch_concurrent_batches: usize,
    /// Mandatory pause between prefetch waves.
    pub prefetch_wave_pause: Duration,
    /// Skip a prefetch fill when its planned TTL is below this.
    pub prefetch_min_ttl: Duration,

    /// Scheduler backoff after a failed prefetch cycle.
    pub scheduler_recovery_delay: Duration,

    /// Idle timeout for pooled upstream connections.
    pub http_pool_idle_timeout: Duration,

    /// NDBC realtime2 base URL.
    pub ndbc_base: String,
    /// NOMADS gfswave base URL.
    pub nomads_base: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            forecast_days: 7,
            periods_per_day: 8,
            period_hours: 3,
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            buoy_timeout: Duration::from_secs(10),
            buoy_deadline: Duration::from_secs(10),
            forecast_deadline: Duration::from_secs(20),
            cache_ceiling: Duration::from_secs(6 * 3600),
            prefetch_batch_size: 5,
            prefetch_concurrent_batches: 3,
            prefetch_wave_pause: Duration::from_millis(1000),
            prefetch_min_ttl: Duration::from_secs(300),
            scheduler_recovery_delay: Duration::from_secs(300),
            http_pool_idle_timeout: Duration::from_secs(60),
            ndbc_base: DEFAULT_NDBC_BASE.to_string(),
            nomads_base: DEFAULT_NOMADS_BASE.to_string(),
        }
    }
}

impl CoreConfig {
    /// Total forecast periods (days × periods/day).
    pub fn forecast_periods(&self) -> usize {
        (self.forecast_days * self.periods_per_day) as usize
    }

    /// Clamp a computed TTL to the configured ceiling.
    pub fn clamp_ttl(&self, ttl: Duration) -> Duration {
        ttl.min(self.cache_ceiling)
    }

    /// Set the NDBC base URL (tests point this at a mock).
    pub fn with_ndbc_base(mut self, base: impl Into<String>) -> Self {
        self.ndbc_base = base.into();
        self
    }

    /// Set the NOMADS base URL (tests point this at a mock).
    pub fn with_nomads_base(mut self, base: impl Into<String>) -> Self {
        self.nomads_base = base.into();
        self
    }

    /// Set the forecast retry pause.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the pause between prefetch waves.
    pub fn with_prefetch_wave_pause(mut self, pause: Duration) -> Self {
        self.prefetch_wave_pause = pause;
        self
    }

    /// Set the planned-TTL threshold below which prefetch fills are
    /// skipped.
    pub fn with_prefetch_min_ttl(mut self, min_ttl: Duration) -> Self {
        self.prefetch_min_ttl = min_ttl;
        self
    }
}
