// Population density cache, keyed by rounded (lat, lon)
// Owned by the caller; the physics models never touch it

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ensure_finite, ensure_non_negative, PhysicsError, Result};

/// Grid cell size for cache keys (degrees)
pub const CELL_SIZE_DEG: f64 = 0.1;

/// Longitude cells around the globe
const LON_CELLS: i64 = 3600;

type CellKey = (i32, i32);

/// Memo of externally supplied densities (persons/km²). Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct PopulationCache {
    cells: Arc<RwLock<HashMap<CellKey, f64>>>,
}

pub fn cell_key(lat_deg: f64, lon_deg: f64) -> Result<CellKey> {
    ensure_finite("latitude", lat_deg)?;
    ensure_finite("longitude", lon_deg)?;
    if !(-90.0..=90.0).contains(&lat_deg) {
        return Err(PhysicsError::InvalidInput {
            field: "latitude",
            reason: format!("must be in [-90, 90], got {lat_deg}"),
        });
    }
    // Round first, then wrap the index into [-1800, 1800) so cells
    // straddling the antimeridian get one key
    let lon_index = (lon_deg / CELL_SIZE_DEG).round() as i64;
    let lon_index = (lon_index + LON_CELLS / 2).rem_euclid(LON_CELLS) - LON_CELLS / 2;
    Ok(((lat_deg / CELL_SIZE_DEG).round() as i32, lon_index as i32))
}

impl PopulationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, lat_deg: f64, lon_deg: f64) -> Result<Option<f64>> {
        let key = cell_key(lat_deg, lon_deg)?;
        Ok(self.cells.read().get(&key).copied())
    }

    /// Store a density; an existing entry for the cell is kept.
    pub fn insert(&self, lat_deg: f64, lon_deg: f64, density: f64) -> Result<f64> {
        let key = cell_key(lat_deg, lon_deg)?;
        ensure_non_negative("population_density", density)?;
        Ok(*self.cells.write().entry(key).or_insert(density))
    }

    /// Cached density for the cell, or the result of `lookup` stored on a miss.
    /// `lookup` runs outside the lock; if another caller filled the cell
    /// meanwhile, their value wins and ours is discarded.
    pub fn get_or_insert_with<F>(&self, lat_deg: f64, lon_deg: f64, lookup: F) -> Result<f64>
    where
        F: FnOnce() -> Option<f64>,
    {
        let key = cell_key(lat_deg, lon_deg)?;
        if let Some(density) = self.cells.read().get(&key).copied() {
            log::debug!("population cache hit for cell {:?}", key);
            return Ok(density);
        }

        let fetched = lookup().ok_or_else(|| PhysicsError::InvalidInput {
            field: "population_density",
            reason: format!("no density available near ({lat_deg}, {lon_deg})"),
        })?;
        ensure_non_negative("population_density", fetched)?;

        Ok(*self.cells.write().entry(key).or_insert(fetched))
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    pub fn clear(&self) {
        self.cells.write().clear();
    }
}
