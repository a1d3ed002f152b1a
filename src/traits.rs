//! Interfaces to the collaborators the planner consumes.
//!
//! Persistence of orders, events and routes lives outside this crate. Hosts
//! implement these traits over their own storage; [`crate::store::MemoryStore`]
//! is the in-memory reference implementation.

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{EventId, LocationId, OrderId, Route, RouteId, ServiceEvent, TenantId};

/// Provides a distance matrix (km) for a set of (lat, lng) locations.
///
/// The matrix is indexed by the provided location order. `None` marks a leg
/// the provider could not resolve.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<Option<f64>>>;
}

/// Persisted, precomputed distances keyed by ordered location pair.
pub trait DistanceCacheStore {
    fn cached_km(&self, from: LocationId, to: LocationId) -> Option<f64>;
}

/// Storage for service events and routes.
pub trait EventStore {
    fn event(&self, id: EventId) -> Result<ServiceEvent>;

    /// Scheduled, live, unrouted events of a tenant dated on or before `until`.
    fn pending_events(&self, tenant: TenantId, until: NaiveDate) -> Vec<ServiceEvent>;

    /// Live events generated for an order, in id order.
    fn order_events(&self, order: OrderId) -> Vec<ServiceEvent>;

    /// Live events on a route in sequence order.
    fn route_events(&self, route: RouteId) -> Result<Vec<ServiceEvent>>;

    /// Store a new event and return its assigned id.
    fn insert_event(&mut self, event: ServiceEvent) -> Result<EventId>;

    /// Remove an event. Routed events are soft-deleted; a route left with no
    /// live events is removed.
    fn delete_event(&mut self, id: EventId) -> Result<()>;

    /// Place an event on a route at `sequence`.
    fn assign_event(&mut self, id: EventId, route: RouteId, sequence: u32) -> Result<()>;

    /// Record the planned drive from the route start to an event.
    fn record_drive(&mut self, id: EventId, km: f64, minutes: f64) -> Result<()>;

    fn route(&self, id: RouteId) -> Result<Route>;

    fn routes_on(&self, tenant: TenantId, date: NaiveDate) -> Vec<Route>;

    /// Store a new route and return its assigned id.
    fn insert_route(&mut self, route: Route) -> Result<RouteId>;

    fn mark_route_stale(&mut self, id: RouteId) -> Result<()>;
}
