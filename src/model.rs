//! Dispatch data model: service events, routes, fleet, unit types, locations.
//!
//! These mirror the records owned by the surrounding persistence layer. The
//! planner reads them as an in-memory snapshot and writes back through
//! [`crate::traits::EventStore`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[derive(Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(EventId);
id_type!(RouteId);
id_type!(OrderId);
id_type!(TruckId);
id_type!(TrailerId);
id_type!(LocationId);
id_type!(UnitTypeId);
id_type!(TenantId);

/// Quantity of each unit type carried by an order or event.
pub type UnitQuantities = BTreeMap<UnitTypeId, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Delivery,
    Service,
    Pickup,
    Dump,
    Refill,
}

impl EventType {
    /// Deliveries and pickups move units on or off the trailer.
    pub fn moves_units(self) -> bool {
        matches!(self, EventType::Delivery | EventType::Pickup)
    }

    /// Dump and refill stops are depot stops, never owned by an order.
    pub fn is_depot_stop(self) -> bool {
        matches!(self, EventType::Dump | EventType::Refill)
    }

    pub fn operation(self) -> Option<Operation> {
        match self {
            EventType::Delivery => Some(Operation::Delivery),
            EventType::Service => Some(Operation::Service),
            EventType::Pickup => Some(Operation::Pickup),
            EventType::Dump | EventType::Refill => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Delivery => "delivery",
            EventType::Service => "service",
            EventType::Pickup => "pickup",
            EventType::Dump => "dump",
            EventType::Refill => "refill",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Completed,
    Skipped,
}

/// A unit operation that draws resources according to the unit type's rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Delivery,
    Service,
    Pickup,
}

/// A place the truck can drive to. Coordinates are (lat, lng).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub coords: Option<(f64, f64)>,
}

impl Location {
    pub fn new(id: u64, lat: f64, lng: f64) -> Self {
        Self {
            id: LocationId(id),
            coords: Some((lat, lng)),
        }
    }

    pub fn unlocated(id: u64) -> Self {
        Self {
            id: LocationId(id),
            coords: None,
        }
    }
}

/// Position of a generated event among its order's delivery or pickup batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTag {
    pub sequence: u32,
    pub total: u32,
}

/// One unit of dispatch work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub id: EventId,
    pub tenant: TenantId,
    pub event_type: EventType,
    pub scheduled_date: NaiveDate,
    pub status: EventStatus,
    pub order_id: Option<OrderId>,
    pub dump_site_id: Option<LocationId>,
    /// Where the stop happens, resolved from the order or dump site.
    pub site: Option<Location>,
    pub quantities: UnitQuantities,
    pub route_id: Option<RouteId>,
    pub sequence: Option<u32>,
    pub drive_km: Option<f64>,
    pub drive_minutes: Option<f64>,
    /// Waste gallons recorded by the driver; overrides the computed draw.
    pub recorded_waste_gallons: Option<f64>,
    pub batch: Option<BatchTag>,
    /// Created by the planner or generator rather than by a person.
    pub auto_generated: bool,
    pub deleted: bool,
}

impl ServiceEvent {
    pub fn new(tenant: TenantId, event_type: EventType, scheduled_date: NaiveDate) -> Self {
        Self {
            id: EventId(0),
            tenant,
            event_type,
            scheduled_date,
            status: EventStatus::Scheduled,
            order_id: None,
            dump_site_id: None,
            site: None,
            quantities: UnitQuantities::new(),
            route_id: None,
            sequence: None,
            drive_km: None,
            drive_minutes: None,
            recorded_waste_gallons: None,
            batch: None,
            auto_generated: false,
            deleted: false,
        }
    }

    /// An auto-generated depot stop (dump or refill) at `site`.
    pub fn depot_stop(
        tenant: TenantId,
        event_type: EventType,
        scheduled_date: NaiveDate,
        site: Location,
    ) -> Self {
        let mut event = Self::new(tenant, event_type, scheduled_date);
        if event_type == EventType::Dump {
            event.dump_site_id = Some(site.id);
        }
        event.site = Some(site);
        event.auto_generated = true;
        event
    }

    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Scheduled && !self.deleted
    }
}

/// One vehicle-day itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub tenant: TenantId,
    pub date: NaiveDate,
    pub truck_id: TruckId,
    pub trailer_id: Option<TrailerId>,
    pub optimization_stale: bool,
    pub drive_km: Option<f64>,
    pub drive_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub tenant: TenantId,
    pub clean_capacity_gallons: Option<f64>,
    pub waste_capacity_gallons: Option<f64>,
    /// Waste on board carried over from earlier routes until a dump.
    pub current_waste_gallons: f64,
    pub preference_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub id: TrailerId,
    pub tenant: TenantId,
    pub spot_capacity: Option<u32>,
    pub preference_rank: Option<u32>,
}

/// How a unit type occupies trailer spots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    /// One spot.
    Standard,
    /// Two spots.
    Accessible,
    /// Rides free alongside toilet-class units, one spot beyond that.
    WashStation,
}

/// Gallons drawn by one unit for one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub clean_gallons: f64,
    pub waste_gallons: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitRates {
    pub delivery: Draw,
    pub service: Draw,
    pub pickup: Draw,
}

impl UnitRates {
    pub fn for_operation(&self, operation: Operation) -> Draw {
        match operation {
            Operation::Delivery => self.delivery,
            Operation::Service => self.service,
            Operation::Pickup => self.pickup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: UnitTypeId,
    pub name: String,
    pub category: UnitCategory,
    pub rates: UnitRates,
}

/// Unit types known to a tenant, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    types: HashMap<UnitTypeId, UnitType>,
}

impl UnitCatalog {
    pub fn new(types: impl IntoIterator<Item = UnitType>) -> Self {
        Self {
            types: types.into_iter().map(|unit| (unit.id, unit)).collect(),
        }
    }

    pub fn get(&self, id: UnitTypeId) -> Result<&UnitType> {
        self.types
            .get(&id)
            .ok_or(PlannerError::UnknownUnitType(id))
    }
}

/// A rental order, the source of generated delivery/service/pickup events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant: TenantId,
    pub site: Location,
    pub delivery_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub service_interval_days: Option<u32>,
    pub quantities: UnitQuantities,
}

/// Trucks, trailers and depot locations of one tenant.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    pub tenant: TenantId,
    pub trucks: Vec<Truck>,
    pub trailers: Vec<Trailer>,
    pub home_base: Option<Location>,
    pub dump_sites: Vec<Location>,
}

impl Fleet {
    /// Lowest preference rank wins, unranked trucks last, id breaks ties.
    pub fn preferred_truck(&self) -> Option<&Truck> {
        self.trucks.iter().min_by_key(|truck| {
            (truck.preference_rank.is_none(), truck.preference_rank, truck.id)
        })
    }

    pub fn preferred_trailer(&self) -> Option<&Trailer> {
        self.trailers.iter().min_by_key(|trailer| {
            (trailer.preference_rank.is_none(), trailer.preference_rank, trailer.id)
        })
    }

    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.trucks.iter().find(|truck| truck.id == id)
    }

    pub fn trailer(&self, id: TrailerId) -> Option<&Trailer> {
        self.trailers.iter().find(|trailer| trailer.id == id)
    }

    /// Distinct configured trailer capacities, ascending.
    pub fn trailer_capacities(&self) -> Vec<u32> {
        let mut capacities: Vec<u32> = self
            .trailers
            .iter()
            .filter_map(|trailer| trailer.spot_capacity)
            .collect();
        capacities.sort_unstable();
        capacities.dedup();
        capacities
    }
}
