//! Persisted distance cache keyed by ordered location pair.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{PlannerError, Result};
use crate::model::{Location, LocationId};
use crate::traits::{DistanceCacheStore, DistanceMatrixProvider};

/// Precomputed distances, unique per ordered (from, to) pair and never negative.
#[derive(Debug, Clone, Default)]
pub struct DistanceCache {
    entries: HashMap<(LocationId, LocationId), f64>,
}

impl DistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for (from, to).
    pub fn insert(&mut self, from: LocationId, to: LocationId, km: f64) -> Result<()> {
        if !km.is_finite() || km < 0.0 {
            return Err(PlannerError::InvalidDistance { from, to, km });
        }
        self.entries.insert((from, to), km);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fill entries for every ordered pair of located `locations` from `provider`.
    ///
    /// Legs the provider cannot resolve are left out; existing entries for
    /// resolved legs are overwritten. Returns the number of entries written.
    pub fn warm<M: DistanceMatrixProvider>(
        &mut self,
        locations: &[Location],
        provider: &M,
    ) -> usize {
        let located: Vec<(LocationId, (f64, f64))> = locations
            .iter()
            .filter_map(|location| location.coords.map(|coords| (location.id, coords)))
            .collect();
        if located.len() < 2 {
            return 0;
        }

        let coords: Vec<(f64, f64)> = located.iter().map(|(_, coords)| *coords).collect();
        let matrix = provider.matrix_for(&coords);

        let mut written = 0;
        for (i, row) in matrix.iter().enumerate().take(located.len()) {
            for (j, km) in row.iter().enumerate().take(located.len()) {
                if i == j {
                    continue;
                }
                let Some(km) = km else {
                    continue;
                };
                if self.insert(located[i].0, located[j].0, *km).is_ok() {
                    written += 1;
                } else {
                    debug!(
                        "Skipping invalid distance {} for {} -> {}",
                        km, located[i].0, located[j].0
                    );
                }
            }
        }

        info!(
            "Warmed distance cache with {} entries for {} locations",
            written,
            located.len()
        );
        written
    }
}

impl DistanceCacheStore for DistanceCache {
    fn cached_km(&self, from: LocationId, to: LocationId) -> Option<f64> {
        self.entries.get(&(from, to)).copied()
    }
}
