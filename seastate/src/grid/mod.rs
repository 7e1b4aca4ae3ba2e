//! Grid router: maps request coordinates onto a regional model and cell.
//!
//! Clients present longitudes in either [−180, 180] or [0, 360]; all grid
//! math here is in [0, 360). Routing scans the models in a fixed order and
//! picks the first whose closed rectangle contains the point; there is no
//! nearest-model fallback.

mod model;

pub use model::{GridAxis, ModelGrid, MODELS};

use crate::error::CoreError;

/// A resolved grid location: the owning model plus row/column indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// The regional model containing the point.
    pub model: &'static ModelGrid,
    /// Latitude index (row-major, lat first).
    pub row: usize,
    /// Longitude index.
    pub col: usize,
}

/// Normalize a longitude into [0, 360). Idempotent.
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = lon % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Resolve a point to a model grid cell.
///
/// # Errors
///
/// `CoreError::OutOfGrid` carrying the original coordinates when no model's
/// rectangle contains the point.
pub fn locate(lat: f64, lon: f64) -> Result<GridCell, CoreError> {
    let lon_n = normalize_longitude(lon);

    for model in &MODELS {
        if model.contains(lat, lon_n) {
            return Ok(GridCell {
                model,
                row: model.lat.index_of(lat),
                col: model.lon.index_of(lon_n),
            });
        }
    }

    Err(CoreError::OutOfGrid { lat, lon })
}

/// True when some model grid covers the point.
pub fn in_any_grid(lat: f64, lon: f64) -> bool {
    let lon_n = normalize_longitude(lon);
    MODELS.iter().any(|m| m.contains(lat, lon_n))
}
