//! Core error taxonomy.
//!
//! Errors are `Clone` because single-flight cache fills broadcast the
//! producer's outcome to every waiter; each waiter gets its own copy.

use thiserror::Error;

/// Errors produced by the refresh-and-caching core.
///
/// The out-of-scope transport layer maps these to HTTP statuses:
/// `NotFound` → 404, `Timeout` → 504, `UpstreamUnavailable` → 502,
/// everything else → 500. `OutOfGrid` never reaches the wire; the
/// aggregator turns it into an omitted forecast.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Station unknown to the catalogue.
    #[error("station {0} not found")]
    NotFound(String),

    /// Upstream responded but contained no usable observation rows.
    #[error("no observation data for station {0}")]
    NoData(String),

    /// Coordinates outside every regional forecast model.
    #[error("coordinates ({lat}, {lon}) are outside all forecast grids")]
    OutOfGrid { lat: f64, lon: f64 },

    /// Network failure, 5xx, or 404 from an upstream producer.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Hard deadline exceeded on an individual fetch.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Parse failure on an otherwise well-formed upstream response.
    #[error("internal error: {0}")]
    Internal(String),

    /// Invalid startup configuration (catalogue file, grid definition).
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Stable kind label used in the envelope's forecast error stub.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::NoData(_) => "NoData",
            Self::OutOfGrid { .. } => "OutOfGrid",
            Self::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Self::Timeout(_) => "Timeout",
            Self::Internal(_) => "Internal",
            Self::Config(_) => "Config",
        }
    }

    /// True for failures worth retrying (forecast fetcher policy).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::Timeout(_))
    }
}
