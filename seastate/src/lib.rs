//! Seastate - marine conditions aggregation core.
//!
//! A read-through aggregator that publishes marine conditions (live buoy
//! observations plus short-range wave forecasts) for a fixed catalogue of
//! offshore stations. The core keeps a hot cache warm through scheduled
//! bulk prefetch aligned to the upstream publication cadences, serves
//! requests from cache whenever possible, and performs single-flight
//! read-through fills on misses with bounded concurrency and hard
//! deadlines.
//!
//! # High-Level API
//!
//! ```ignore
//! use seastate::config::CoreConfig;
//! use seastate::service::CoreServices;
//! use seastate::station::StationCatalog;
//!
//! let catalog = StationCatalog::load("stations.geojson")?;
//! let services = CoreServices::new(CoreConfig::default(), catalog)?;
//!
//! let shutdown = tokio_util::sync::CancellationToken::new();
//! tokio::spawn(services.scheduler().run(shutdown.clone()));
//!
//! let envelope = services.get_station("46042").await?;
//! ```

pub mod aggregator;
pub mod buoy;
pub mod cache;
pub mod cadence;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod grid;
pub mod prefetch;
pub mod scheduler;
pub mod service;
pub mod station;

/// Version of the seastate library and CLI.
///
/// Synchronized across all workspace components via `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
