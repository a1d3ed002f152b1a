//! Straight-line distance lookup with an in-run memo.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::haversine::haversine_km;
use crate::model::{Location, LocationId};
use crate::traits::DistanceCacheStore;

/// Stand-in used when scoring with an unknown distance.
pub const UNKNOWN_DISTANCE_KM: f64 = 1.0e6;

/// Resolves distances between locations for one planning run.
///
/// Lookup order: run memo (unordered pair), persisted cache (either
/// direction), then haversine. Haversine results are memoized for the run but
/// not written back to the cache.
pub struct DistanceLookup<'a, C: DistanceCacheStore> {
    cache: &'a C,
    memo: RefCell<HashMap<(LocationId, LocationId), f64>>,
}

impl<'a, C: DistanceCacheStore> DistanceLookup<'a, C> {
    pub fn new(cache: &'a C) -> Self {
        Self {
            cache,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Distance in km, or `None` when either location has no coordinates.
    pub fn distance(&self, a: &Location, b: &Location) -> Option<f64> {
        let (from, to) = (a.coords?, b.coords?);
        if a.id == b.id {
            return Some(0.0);
        }

        let key = memo_key(a.id, b.id);
        if let Some(km) = self.memo.borrow().get(&key) {
            return Some(*km);
        }

        let km = self
            .cache
            .cached_km(a.id, b.id)
            .or_else(|| self.cache.cached_km(b.id, a.id))
            .unwrap_or_else(|| haversine_km(from, to));
        self.memo.borrow_mut().insert(key, km);
        Some(km)
    }

    /// Distance for scoring: unknown is the worst case, never zero.
    pub fn score_distance(&self, a: &Location, b: &Location) -> f64 {
        self.distance(a, b).unwrap_or(UNKNOWN_DISTANCE_KM)
    }

    /// Whether two locations are within `radius_km`. Unknown is never near.
    pub fn within(&self, a: &Location, b: &Location, radius_km: f64) -> bool {
        self.distance(a, b).is_some_and(|km| km <= radius_km)
    }

    /// The closest of `candidates` to `from`, first listed on ties or when
    /// every distance is unknown.
    pub fn nearest<'l>(&self, from: &Location, candidates: &'l [Location]) -> Option<&'l Location> {
        let mut best: Option<(&Location, f64)> = None;
        for candidate in candidates {
            let km = self.score_distance(from, candidate);
            if best.is_none_or(|(_, best_km)| km < best_km) {
                best = Some((candidate, km));
            }
        }
        best.map(|(location, _)| location)
    }
}

fn memo_key(a: LocationId, b: LocationId) -> (LocationId, LocationId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance_cache::DistanceCache;

    #[test]
    fn test_missing_coordinates_are_unknown() {
        let cache = DistanceCache::new();
        let lookup = DistanceLookup::new(&cache);
        let a = Location::new(1, 43.0, -90.0);
        let b = Location::unlocated(2);
        assert_eq!(lookup.distance(&a, &b), None);
        assert_eq!(lookup.score_distance(&a, &b), UNKNOWN_DISTANCE_KM);
        assert!(!lookup.within(&a, &b, 1.0e9));
    }

    #[test]
    fn test_cache_wins_over_haversine_in_either_direction() {
        let mut cache = DistanceCache::new();
        cache.insert(LocationId(2), LocationId(1), 42.0).unwrap();
        let lookup = DistanceLookup::new(&cache);
        let a = Location::new(1, 43.0, -90.0);
        let b = Location::new(2, 43.0, -89.95);
        assert_eq!(lookup.distance(&a, &b), Some(42.0));
        assert_eq!(lookup.distance(&b, &a), Some(42.0));
    }

    #[test]
    fn test_symmetric_haversine_fallback() {
        let cache = DistanceCache::new();
        let lookup = DistanceLookup::new(&cache);
        let a = Location::new(1, 43.0, -90.0);
        let b = Location::new(2, 43.0, -89.95);
        let ab = lookup.distance(&a, &b).unwrap();
        let ba = lookup.distance(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert!(ab > 3.5 && ab < 4.5);
    }

    #[test]
    fn test_nearest_prefers_known_distance() {
        let cache = DistanceCache::new();
        let lookup = DistanceLookup::new(&cache);
        let from = Location::new(1, 43.0, -90.0);
        let sites = vec![
            Location::unlocated(10),
            Location::new(11, 43.5, -90.0),
            Location::new(12, 43.1, -90.0),
        ];
        let nearest = lookup.nearest(&from, &sites).map(|l| l.id);
        assert_eq!(nearest, Some(LocationId(12)));
        assert!(lookup.nearest(&from, &[]).is_none());
    }
}
