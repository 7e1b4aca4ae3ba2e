//! Shared prefetch status for operational visibility.
//!
//! One writer per cycle; readers take a cloned snapshot. Exposed through
//! the health surface so partial success is observable.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A station-level prefetch failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefetchFailure {
    pub station_id: String,
    pub message: String,
}

/// Point-in-time view of prefetch progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrefetchSnapshot {
    /// True while a cycle is executing.
    pub running: bool,
    /// Stations eligible in the current/last cycle.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Failures from the current/last cycle.
    pub errors: Vec<PrefetchFailure>,
    /// Completion instant of the last finished cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<DateTime<Utc>>,
    /// Cycles completed since startup.
    pub cycles_completed: u64,
}

/// Thread-safe prefetch status shared between the prefetcher and the
/// health surface.
#[derive(Debug, Default)]
pub struct SharedPrefetchStatus {
    inner: RwLock<PrefetchSnapshot>,
}

impl SharedPrefetchStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reset counters at the start of a cycle.
    pub fn begin_cycle(&self, total: usize) {
        if let Ok(mut inner) = self.inner.write() {
            let cycles = inner.cycles_completed;
            let last = inner.last_completed;
            *inner = PrefetchSnapshot {
                running: true,
                total,
                cycles_completed: cycles,
                last_completed: last,
                ..Default::default()
            };
        }
    }

    pub fn record_success(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.succeeded += 1;
        }
    }

    pub fn record_skip(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.skipped += 1;
        }
    }

    pub fn record_failure(&self, station_id: &str, message: String) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failed += 1;
            inner.errors.push(PrefetchFailure {
                station_id: station_id.to_string(),
                message,
            });
        }
    }

    /// Mark the cycle finished.
    pub fn complete_cycle(&self, at: DateTime<Utc>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.running = false;
            inner.last_completed = Some(at);
            inner.cycles_completed += 1;
        }
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> PrefetchSnapshot {
        self.inner.read().map(|inner| inner.clone()).unwrap_or_default()
    }
}
