//! In-memory event and route storage.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{PlannerError, Result};
use crate::model::{EventId, OrderId, Route, RouteId, ServiceEvent, TenantId};
use crate::traits::EventStore;

/// [`EventStore`] backed by ordered maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: BTreeMap<EventId, ServiceEvent>,
    routes: BTreeMap<RouteId, Route>,
    next_event: u64,
    next_route: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event, including soft-deleted ones.
    pub fn all_events(&self) -> impl Iterator<Item = &ServiceEvent> {
        self.events.values()
    }

    pub fn all_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    fn event_mut(&mut self, id: EventId) -> Result<&mut ServiceEvent> {
        self.events
            .get_mut(&id)
            .ok_or(PlannerError::UnknownEvent(id))
    }

    fn live_on_route(&self, route: RouteId) -> usize {
        self.events
            .values()
            .filter(|event| !event.deleted && event.route_id == Some(route))
            .count()
    }
}

impl EventStore for MemoryStore {
    fn event(&self, id: EventId) -> Result<ServiceEvent> {
        self.events
            .get(&id)
            .cloned()
            .ok_or(PlannerError::UnknownEvent(id))
    }

    fn pending_events(&self, tenant: TenantId, until: NaiveDate) -> Vec<ServiceEvent> {
        self.events
            .values()
            .filter(|event| {
                event.tenant == tenant
                    && event.is_pending()
                    && event.route_id.is_none()
                    && event.scheduled_date <= until
            })
            .cloned()
            .collect()
    }

    fn order_events(&self, order: OrderId) -> Vec<ServiceEvent> {
        self.events
            .values()
            .filter(|event| !event.deleted && event.order_id == Some(order))
            .cloned()
            .collect()
    }

    fn route_events(&self, route: RouteId) -> Result<Vec<ServiceEvent>> {
        if !self.routes.contains_key(&route) {
            return Err(PlannerError::UnknownRoute(route));
        }
        let mut events: Vec<ServiceEvent> = self
            .events
            .values()
            .filter(|event| !event.deleted && event.route_id == Some(route))
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.sequence.unwrap_or(u32::MAX), event.id));
        Ok(events)
    }

    fn insert_event(&mut self, mut event: ServiceEvent) -> Result<EventId> {
        self.next_event += 1;
        let id = EventId(self.next_event);
        if event.event_type.is_depot_stop() {
            event.order_id = None;
        }
        event.id = id;
        self.events.insert(id, event);
        Ok(id)
    }

    fn delete_event(&mut self, id: EventId) -> Result<()> {
        let route = self.event(id)?.route_id;
        match route {
            Some(route_id) => {
                self.event_mut(id)?.deleted = true;
                if self.live_on_route(route_id) == 0 {
                    debug!("Removing empty route {}", route_id);
                    self.routes.remove(&route_id);
                } else if let Some(route) = self.routes.get_mut(&route_id) {
                    route.optimization_stale = true;
                }
            }
            None => {
                self.events.remove(&id);
            }
        }
        Ok(())
    }

    fn assign_event(&mut self, id: EventId, route: RouteId, sequence: u32) -> Result<()> {
        if !self.routes.contains_key(&route) {
            return Err(PlannerError::UnknownRoute(route));
        }
        let event = self.event_mut(id)?;
        event.route_id = Some(route);
        event.sequence = Some(sequence);
        Ok(())
    }

    fn record_drive(&mut self, id: EventId, km: f64, minutes: f64) -> Result<()> {
        let event = self.event_mut(id)?;
        event.drive_km = Some(km);
        event.drive_minutes = Some(minutes);
        Ok(())
    }

    fn route(&self, id: RouteId) -> Result<Route> {
        self.routes
            .get(&id)
            .cloned()
            .ok_or(PlannerError::UnknownRoute(id))
    }

    fn routes_on(&self, tenant: TenantId, date: NaiveDate) -> Vec<Route> {
        self.routes
            .values()
            .filter(|route| route.tenant == tenant && route.date == date)
            .cloned()
            .collect()
    }

    fn insert_route(&mut self, mut route: Route) -> Result<RouteId> {
        self.next_route += 1;
        let id = RouteId(self.next_route);
        route.id = id;
        self.routes.insert(id, route);
        Ok(id)
    }

    fn mark_route_stale(&mut self, id: RouteId) -> Result<()> {
        let route = self
            .routes
            .get_mut(&id)
            .ok_or(PlannerError::UnknownRoute(id))?;
        route.optimization_stale = true;
        Ok(())
    }
}
