//! Tenant routing settings and write options.

use serde::{Deserialize, Serialize};

/// Per-tenant knobs for candidate collection, clustering and route building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Days ahead of the planning date whose events are considered.
    pub horizon_days: u32,
    /// Waste level, as a percent of truck waste capacity, that triggers a dump.
    pub dump_threshold_percent: f64,
    /// Maximum distance between two directly linked cluster members.
    pub cluster_radius_km: f64,
    /// Waste headroom fraction at or below which dump proximity biases scoring.
    pub dump_bias_headroom: f64,
    /// Trailer headroom fraction at or below which home proximity biases scoring.
    pub home_bias_headroom: f64,
    /// Multiplier applied to the biased distance.
    pub bias_weight: f64,
    /// Divisor applied to the home-to-candidate distance in scoring.
    pub home_distance_divisor: f64,
    pub min_iteration_cap: usize,
    pub iteration_cap_factor: usize,
    /// Speed used to turn planned drive distance into drive time.
    pub average_speed_kmh: f64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            horizon_days: 3,
            dump_threshold_percent: 90.0,
            cluster_radius_km: 16.1,
            dump_bias_headroom: 0.20,
            home_bias_headroom: 0.20,
            bias_weight: 0.25,
            home_distance_divisor: 100.0,
            min_iteration_cap: 1000,
            iteration_cap_factor: 3,
            average_speed_kmh: 40.0,
        }
    }
}

impl RoutingSettings {
    /// Waste level at which the truck should dump, if capacity is known.
    pub fn dump_threshold(&self, waste_capacity: Option<f64>) -> Option<f64> {
        waste_capacity.map(|capacity| capacity * self.dump_threshold_percent / 100.0)
    }

    pub fn iteration_cap(&self, candidates: usize) -> usize {
        (self.iteration_cap_factor * candidates).max(self.min_iteration_cap)
    }

    pub fn drive_minutes(&self, km: f64) -> f64 {
        if self.average_speed_kmh <= 0.0 {
            return 0.0;
        }
        km / self.average_speed_kmh * 60.0
    }
}

/// Knobs for generating an order's events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// How far past delivery to schedule services when an order has no pickup date.
    pub open_ended_service_days: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            open_ended_service_days: 90,
        }
    }
}

/// Options threaded through bulk writes.
///
/// When `auto_assign` is off, newly written events are left unrouted so a
/// backfill can plan them in one pass instead of creating routes per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteContext {
    pub auto_assign: bool,
}

impl Default for WriteContext {
    fn default() -> Self {
        Self { auto_assign: true }
    }
}

impl WriteContext {
    pub fn bulk() -> Self {
        Self { auto_assign: false }
    }
}
