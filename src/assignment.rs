//! Appending single events to the route for their date.

use tracing::{debug, warn};

use crate::config::RoutingSettings;
use crate::error::{PlannerError, Result};
use crate::model::{EventId, Fleet, Route, RouteId, TenantId, Trailer, Truck};
use crate::route_builder::{PlannedStop, RoutePlan};
use crate::traits::EventStore;

/// Check that the truck and trailer belong to the route's tenant.
pub fn validate_route_resources(
    tenant: TenantId,
    truck: &Truck,
    trailer: Option<&Trailer>,
) -> Result<()> {
    if truck.tenant != tenant {
        return Err(PlannerError::TenantMismatch {
            resource: format!("truck {}", truck.id),
            resource_tenant: truck.tenant.0,
            route_tenant: tenant.0,
        });
    }
    if let Some(trailer) = trailer {
        if trailer.tenant != tenant {
            return Err(PlannerError::TenantMismatch {
                resource: format!("trailer {}", trailer.id),
                resource_tenant: trailer.tenant.0,
                route_tenant: tenant.0,
            });
        }
    }
    Ok(())
}

pub struct RouteAssigner<'a> {
    fleet: &'a Fleet,
}

impl<'a> RouteAssigner<'a> {
    pub fn new(fleet: &'a Fleet) -> Self {
        Self { fleet }
    }

    /// Append `event_id` to its tenant's route on the event date, creating
    /// the route with the preferred truck and trailer if none exists.
    ///
    /// Returns `None` when the fleet has no truck to build a route with.
    pub fn assign<S: EventStore>(
        &self,
        store: &mut S,
        event_id: EventId,
    ) -> Result<Option<RouteId>> {
        let event = store.event(event_id)?;
        if let Some(route_id) = event.route_id {
            return Ok(Some(route_id));
        }

        let existing = store
            .routes_on(event.tenant, event.scheduled_date)
            .into_iter()
            .min_by_key(|route| route.id);
        let route_id = match existing {
            Some(route) => route.id,
            None => {
                let Some(truck) = self.fleet.preferred_truck() else {
                    warn!("No truck available to route event {}", event_id);
                    return Ok(None);
                };
                let trailer = self.fleet.preferred_trailer();
                validate_route_resources(event.tenant, truck, trailer)?;

                let route_id = store.insert_route(Route {
                    id: RouteId(0),
                    tenant: event.tenant,
                    date: event.scheduled_date,
                    truck_id: truck.id,
                    trailer_id: trailer.map(|t| t.id),
                    optimization_stale: true,
                    drive_km: None,
                    drive_minutes: None,
                })?;
                debug!(
                    "Created route {} for {} with truck {}",
                    route_id, event.scheduled_date, truck.id
                );
                route_id
            }
        };

        let position = store.route_events(route_id)?.len() as u32;
        store.assign_event(event_id, route_id, position)?;
        store.mark_route_stale(route_id)?;
        Ok(Some(route_id))
    }

    /// Store `plan` as a new route on the preferred truck and trailer.
    ///
    /// Events keep the plan's order and record their drive from the route
    /// start. Virtual stops are not stored; capacity enforcement
    /// materializes them later.
    pub fn commit_plan<S: EventStore>(
        &self,
        store: &mut S,
        tenant: TenantId,
        plan: &RoutePlan,
        settings: &RoutingSettings,
    ) -> Result<Option<RouteId>> {
        let Some(truck) = self.fleet.preferred_truck() else {
            warn!("No truck available for the route on {}", plan.date);
            return Ok(None);
        };
        let trailer = self.fleet.preferred_trailer();
        validate_route_resources(tenant, truck, trailer)?;

        let route_id = store.insert_route(Route {
            id: RouteId(0),
            tenant,
            date: plan.date,
            truck_id: truck.id,
            trailer_id: trailer.map(|t| t.id),
            optimization_stale: false,
            drive_km: Some(plan.drive_km),
            drive_minutes: Some(settings.drive_minutes(plan.drive_km)),
        })?;

        let mut position = 0;
        for (stop, km) in plan.stops.iter().zip(&plan.arrival_km) {
            let PlannedStop::Event(candidate) = stop else {
                continue;
            };
            store.assign_event(candidate.event_id, route_id, position)?;
            store.record_drive(candidate.event_id, *km, settings.drive_minutes(*km))?;
            position += 1;
        }

        debug!(
            "Committed route {} for {}: {} events, {:.1} km",
            route_id, plan.date, position, plan.drive_km
        );
        Ok(Some(route_id))
    }
}
