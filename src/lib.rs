//! dispatch-planner core
//!
//! Capacity-constrained routing and batching for portable sanitation
//! dispatch: collecting pending work, clustering it by proximity, building
//! daily routes with dump and refill stops, and checking stored routes
//! against truck and trailer capacities.

pub mod traits;
pub mod model;
pub mod config;
pub mod error;
pub mod resources;
pub mod haversine;
pub mod osrm;
pub mod distance_cache;
pub mod distance;
pub mod store;
pub mod candidates;
pub mod cluster;
pub mod route_builder;
pub mod planner;
pub mod capacity_simulator;
pub mod capacity_planner;
pub mod batching;
pub mod assignment;
pub mod generator;
pub mod waste;

pub use error::{PlannerError, Result};
