//! Candidate collection for one planning run.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::model::{EventId, EventType, Location, ServiceEvent, TenantId, UnitCatalog};
use crate::resources::{ResourceUsage, resource_usage};
use crate::traits::EventStore;

/// A pending event wrapped with what the route builder needs.
///
/// Lives for one planning run only and is never written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub event_id: EventId,
    pub event_type: EventType,
    pub due_date: NaiveDate,
    pub location: Location,
    pub usage: ResourceUsage,
}

impl Candidate {
    pub fn from_event(event: &ServiceEvent, catalog: &UnitCatalog) -> Result<Self> {
        let location = event
            .site
            .filter(|site| site.coords.is_some())
            .ok_or(PlannerError::MissingCoordinates { event_id: event.id })?;

        Ok(Self {
            event_id: event.id,
            event_type: event.event_type,
            due_date: event.scheduled_date,
            location,
            usage: resource_usage(event, catalog)?,
        })
    }
}

/// Collects routable events within the planning horizon.
pub struct CandidatePool;

impl CandidatePool {
    /// Wrap every scheduled, unrouted delivery/service/pickup of `tenant` due
    /// on or before `start + horizon_days`.
    ///
    /// An event without coordinates fails the whole collection, naming the event.
    pub fn collect<S: EventStore>(
        store: &S,
        tenant: TenantId,
        start: NaiveDate,
        horizon_days: u32,
        catalog: &UnitCatalog,
    ) -> Result<Vec<Candidate>> {
        let until = start
            .checked_add_days(Days::new(u64::from(horizon_days)))
            .unwrap_or(NaiveDate::MAX);

        let candidates = store
            .pending_events(tenant, until)
            .iter()
            .filter(|event| !event.event_type.is_depot_stop())
            .map(|event| Candidate::from_event(event, catalog))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Collected {} candidates for tenant {} through {}",
            candidates.len(),
            tenant,
            until
        );
        Ok(candidates)
    }
}
