//! TTL cache with atomic get-or-compute.
//!
//! Entries expire at an absolute instant; an expired read is identical to
//! a miss. Concurrent fills for the same key coalesce to one producer
//! invocation (single-flight): late arrivals await the leader's result
//! over a broadcast channel and receive either the produced value or the
//! producer's error. Failures are never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::CoreError;

enum Slot<T> {
    Ready { value: T, expires_at: Instant },
    Pending { tx: broadcast::Sender<Result<T, CoreError>> },
}

/// Counters for cache behaviour, snapshot on demand.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fills: AtomicU64,
    coalesced: AtomicU64,
}

/// Point-in-time view of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub fills: u64,
    pub coalesced: u64,
}

/// Keyed in-memory TTL store with single-flight fills.
///
/// Bounded in practice by the station catalogue (low hundreds of keys per
/// family); time expiry is the only eviction policy.
pub struct TtlCache<T> {
    slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
    counters: Counters,
}

impl<T: Clone + Send + 'static> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> TtlCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            counters: Counters::default(),
        }
    }

    /// Return the entry for `key` if present and not expired.
    ///
    /// An expired entry is removed and reported as a miss. A fill in
    /// progress is not a value and also reads as a miss.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            Some(Slot::Ready { .. }) => {
                slots.remove(key);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            _ => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Unconditional write with expiry `now + ttl`.
    pub fn put(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(
            key.into(),
            Slot::Ready {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Atomically return a fresh entry, join an in-flight fill, or run
    /// `producer` and publish its result under `key` with the given TTL.
    ///
    /// Exactly one producer runs per key at a time; every concurrent
    /// caller receives the same value or the same error. Errors are
    /// propagated and never stored. If the leading caller is cancelled
    /// mid-fill its slot is released and waiters see a `Timeout`.
    pub async fn get_or_fill<F>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, CoreError>
    where
        F: std::future::Future<Output = Result<T, CoreError>>,
    {
        enum Role<T> {
            Waiter(broadcast::Receiver<Result<T, CoreError>>),
            Leader(broadcast::Sender<Result<T, CoreError>>),
        }

        let role = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            match slots.get(key) {
                Some(Slot::Ready { value, expires_at }) if *expires_at > Instant::now() => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value.clone());
                }
                Some(Slot::Pending { tx }) => {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    Role::Waiter(tx.subscribe())
                }
                _ => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    let (tx, _) = broadcast::channel(1);
                    slots.insert(key.to_string(), Slot::Pending { tx: tx.clone() });
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => {
                trace!(key, "joining in-flight cache fill");
                match rx.recv().await {
                    Ok(result) => result,
                    // Channel closed without a result: the leader was
                    // dropped before publishing.
                    Err(_) => Err(CoreError::Timeout(format!("fill for {key} was cancelled"))),
                }
            }
            Role::Leader(tx) => {
                let guard = FillGuard {
                    slots: Arc::clone(&self.slots),
                    key: key.to_string(),
                    armed: true,
                };

                let result = producer.await;

                {
                    let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
                    match &result {
                        Ok(value) => {
                            self.counters.fills.fetch_add(1, Ordering::Relaxed);
                            slots.insert(
                                key.to_string(),
                                Slot::Ready {
                                    value: value.clone(),
                                    expires_at: Instant::now() + ttl,
                                },
                            );
                        }
                        Err(err) => {
                            debug!(key, error = %err, "cache fill failed, releasing slot");
                            slots.remove(key);
                        }
                    }
                }

                guard.disarm();
                let _ = tx.send(result.clone());
                result
            }
        }
    }

    /// Drop every entry.
    pub fn purge(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let count = slots.len();
        slots.clear();
        debug!(purged = count, "cache purged");
    }

    /// Number of fresh entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready { expires_at, .. } if *expires_at > now))
            .count()
    }

    /// True when no fresh entries exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of hit/miss/fill counters.
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fills: self.counters.fills.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }
}

/// Releases a pending slot if the leading fill is dropped before it
/// publishes, so an abandoned key never wedges later callers.
struct FillGuard<T> {
    slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
    key: String,
    armed: bool,
}

impl<T> FillGuard<T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for FillGuard<T> {
    fn drop(&mut self) {
        if self.armed {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(slots.get(&self.key), Some(Slot::Pending { .. })) {
                slots.remove(&self.key);
            }
        }
    }
}
