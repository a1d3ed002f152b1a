//! Error types for the dispatch planner.

use thiserror::Error;

use crate::model::{EventId, LocationId, RouteId, UnitTypeId};

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    /// The route builder looped past its iteration cap. This is a defect in
    /// the builder, never a user error.
    #[error("route builder hit its iteration cap of {cap} ({placed} of {cluster_size} placed)")]
    IterationCapExceeded {
        cap: usize,
        cluster_size: usize,
        placed: usize,
    },

    #[error("service event {event_id} has no coordinates and cannot be routed")]
    MissingCoordinates { event_id: EventId },

    #[error("{resource} belongs to tenant {resource_tenant}, not route tenant {route_tenant}")]
    TenantMismatch {
        resource: String,
        resource_tenant: u64,
        route_tenant: u64,
    },

    #[error("unknown service event {0}")]
    UnknownEvent(EventId),

    #[error("unknown route {0}")]
    UnknownRoute(RouteId),

    #[error("unknown unit type {0}")]
    UnknownUnitType(UnitTypeId),

    #[error("invalid cached distance {km} km from {from} to {to}")]
    InvalidDistance {
        from: LocationId,
        to: LocationId,
        km: f64,
    },
}

pub type Result<T> = std::result::Result<T, PlannerError>;
