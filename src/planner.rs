//! Planning run: candidates, clusters, routes.

use chrono::NaiveDate;
use tracing::info;

use crate::candidates::{Candidate, CandidatePool};
use crate::cluster::Clusterer;
use crate::config::RoutingSettings;
use crate::distance::DistanceLookup;
use crate::error::Result;
use crate::model::{TenantId, UnitCatalog};
use crate::route_builder::{FleetState, RouteBuilder, RoutePlan};
use crate::traits::{DistanceCacheStore, EventStore};

pub struct Planner<'a, C: DistanceCacheStore> {
    settings: &'a RoutingSettings,
    fleet: &'a FleetState,
    distances: &'a DistanceLookup<'a, C>,
}

impl<'a, C: DistanceCacheStore> Planner<'a, C> {
    pub fn new(
        settings: &'a RoutingSettings,
        fleet: &'a FleetState,
        distances: &'a DistanceLookup<'a, C>,
    ) -> Self {
        Self {
            settings,
            fleet,
            distances,
        }
    }

    /// Plan every pending event of `tenant` within the horizon from `start`.
    pub fn plan<S: EventStore>(
        &self,
        store: &S,
        tenant: TenantId,
        catalog: &UnitCatalog,
        start: NaiveDate,
    ) -> Result<Vec<RoutePlan>> {
        let horizon = self.settings.horizon_days;
        let candidates = CandidatePool::collect(store, tenant, start, horizon, catalog)?;
        self.plan_candidates(candidates, start)
    }

    /// Cluster `candidates` and build routes for each cluster independently.
    pub fn plan_candidates(
        &self,
        candidates: Vec<Candidate>,
        start: NaiveDate,
    ) -> Result<Vec<RoutePlan>> {
        let candidate_count = candidates.len();
        let clusterer = Clusterer::new(self.settings.cluster_radius_km);
        let clusters = clusterer.cluster(candidates, self.distances);
        let builder = RouteBuilder::new(self.settings, self.fleet, self.distances);

        let mut plans = Vec::new();
        for cluster in clusters {
            plans.extend(builder.build(cluster, start)?);
        }

        info!(
            "Planned {} candidates into {} routes starting {}",
            candidate_count,
            plans.len(),
            start
        );
        Ok(plans)
    }
}
