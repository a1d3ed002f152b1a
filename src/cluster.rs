//! Proximity clustering of candidates.

use std::collections::VecDeque;

use tracing::debug;

use crate::candidates::Candidate;
use crate::distance::DistanceLookup;
use crate::traits::DistanceCacheStore;

/// Partitions candidates into connected components under "within radius".
#[derive(Debug, Clone, Copy)]
pub struct Clusterer {
    pub radius_km: f64,
}

impl Clusterer {
    pub fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }

    /// Breadth-first expansion from each unassigned seed.
    ///
    /// Pairs with unknown distance are never linked directly but can still
    /// share a cluster through an intermediate candidate.
    pub fn cluster<C: DistanceCacheStore>(
        &self,
        candidates: Vec<Candidate>,
        distances: &DistanceLookup<'_, C>,
    ) -> Vec<Vec<Candidate>> {
        let mut pool: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
        let mut clusters = Vec::new();

        for seed in 0..pool.len() {
            let Some(first) = pool[seed].take() else {
                continue;
            };
            let mut members = Vec::new();
            let mut frontier = VecDeque::from([first]);

            while let Some(current) = frontier.pop_front() {
                for slot in pool.iter_mut() {
                    let linked = slot.as_ref().is_some_and(|other| {
                        distances.within(&current.location, &other.location, self.radius_km)
                    });
                    if linked {
                        if let Some(other) = slot.take() {
                            frontier.push_back(other);
                        }
                    }
                }
                members.push(current);
            }

            clusters.push(members);
        }

        debug!(
            "Formed {} clusters at {} km",
            clusters.len(),
            self.radius_km
        );
        clusters
    }
}
