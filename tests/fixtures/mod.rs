//! Test fixtures for dispatch-planner.
//!
//! Provides realistic test data including:
//! - Job sites around Madison, WI and a distant Milwaukee cluster
//! - Builders for events, orders and fleets
//! - A helper that writes a route plan into a store the way a dispatcher would

#![allow(dead_code)]

use chrono::NaiveDate;

use dispatch_planner::assignment::RouteAssigner;
use dispatch_planner::config::RoutingSettings;
use dispatch_planner::model::{
    Draw, EventId, EventType, Fleet, Location, Order, OrderId, RouteId, ServiceEvent, TenantId,
    Trailer, TrailerId, Truck, TruckId, UnitCatalog, UnitCategory, UnitQuantities, UnitRates,
    UnitType, UnitTypeId,
};
use dispatch_planner::route_builder::RoutePlan;
use dispatch_planner::store::MemoryStore;
use dispatch_planner::traits::EventStore;

pub const TENANT: TenantId = TenantId(1);

pub const STANDARD: UnitTypeId = UnitTypeId(1);
pub const ACCESSIBLE: UnitTypeId = UnitTypeId(2);
pub const WASH_STATION: UnitTypeId = UnitTypeId(3);

/// A named site with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Site {
    pub id: u64,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Site {
    pub const fn new(id: u64, name: &'static str, lat: f64, lng: f64) -> Self {
        Self { id, name, lat, lng }
    }

    pub fn location(&self) -> Location {
        Location::new(self.id, self.lat, self.lng)
    }
}

// ============================================================================
// Depots
// ============================================================================

pub const YARD: Site = Site::new(900, "Fitchburg yard", 43.0161, -89.4243);
pub const NINE_SPRINGS: Site = Site::new(901, "Nine Springs treatment plant", 43.0358, -89.3537);

// ============================================================================
// Madison job sites
// ============================================================================

pub const MADISON_SITES: &[Site] = &[
    Site::new(1, "Camp Randall Stadium", 43.0700, -89.4127),
    Site::new(2, "Alliant Energy Center", 43.0494, -89.3785),
    Site::new(3, "Olbrich Gardens", 43.0935, -89.3383),
    Site::new(4, "Breese Stevens Field", 43.0814, -89.3715),
    Site::new(5, "Capitol Square", 43.0747, -89.3841),
    Site::new(6, "Lake Farm County Park", 43.0298, -89.3480),
    Site::new(7, "Vilas Park", 43.0598, -89.4136),
    Site::new(8, "Tenney Park", 43.0923, -89.3690),
];

// ============================================================================
// Milwaukee job sites (well outside any Madison cluster)
// ============================================================================

pub const MILWAUKEE_SITES: &[Site] = &[
    Site::new(101, "Henry Maier Festival Park", 43.0327, -87.8984),
    Site::new(102, "American Family Field", 43.0280, -87.9712),
];

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Standard, accessible and wash-station units with typical draws.
pub fn catalog() -> UnitCatalog {
    let rates = |service_clean: f64, service_waste: f64| UnitRates {
        delivery: Draw {
            clean_gallons: 5.0,
            waste_gallons: 0.0,
        },
        service: Draw {
            clean_gallons: service_clean,
            waste_gallons: service_waste,
        },
        pickup: Draw {
            clean_gallons: 0.0,
            waste_gallons: service_waste / 2.0,
        },
    };
    UnitCatalog::new([
        UnitType {
            id: STANDARD,
            name: "Standard restroom".into(),
            category: UnitCategory::Standard,
            rates: rates(5.0, 15.0),
        },
        UnitType {
            id: ACCESSIBLE,
            name: "Accessible restroom".into(),
            category: UnitCategory::Accessible,
            rates: rates(8.0, 20.0),
        },
        UnitType {
            id: WASH_STATION,
            name: "Hand wash station".into(),
            category: UnitCategory::WashStation,
            rates: rates(10.0, 10.0),
        },
    ])
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for test events with sensible defaults.
#[derive(Debug, Clone)]
pub struct TestEvent {
    event: ServiceEvent,
}

impl TestEvent {
    pub fn new(event_type: EventType, date: NaiveDate) -> Self {
        Self {
            event: ServiceEvent::new(TENANT, event_type, date),
        }
    }

    pub fn delivery(date: NaiveDate) -> Self {
        Self::new(EventType::Delivery, date)
    }

    pub fn service(date: NaiveDate) -> Self {
        Self::new(EventType::Service, date)
    }

    pub fn pickup(date: NaiveDate) -> Self {
        Self::new(EventType::Pickup, date)
    }

    pub fn at(mut self, site: &Site) -> Self {
        self.event.site = Some(site.location());
        self
    }

    pub fn units(mut self, unit_type: UnitTypeId, quantity: u32) -> Self {
        self.event.quantities.insert(unit_type, quantity);
        self
    }

    pub fn recorded_waste(mut self, gallons: f64) -> Self {
        self.event.recorded_waste_gallons = Some(gallons);
        self
    }

    pub fn build(self) -> ServiceEvent {
        self.event
    }

    pub fn insert(self, store: &mut MemoryStore) -> EventId {
        store.insert_event(self.event).unwrap()
    }
}

/// Builder for a single-truck fleet based at the Fitchburg yard.
#[derive(Debug, Clone)]
pub struct TestFleet {
    fleet: Fleet,
}

impl TestFleet {
    pub fn new() -> Self {
        Self {
            fleet: Fleet {
                tenant: TENANT,
                trucks: vec![Truck {
                    id: TruckId(1),
                    tenant: TENANT,
                    clean_capacity_gallons: None,
                    waste_capacity_gallons: None,
                    current_waste_gallons: 0.0,
                    preference_rank: Some(1),
                }],
                trailers: Vec::new(),
                home_base: Some(YARD.location()),
                dump_sites: vec![NINE_SPRINGS.location()],
            },
        }
    }

    pub fn waste_capacity(mut self, gallons: f64) -> Self {
        self.fleet.trucks[0].waste_capacity_gallons = Some(gallons);
        self
    }

    pub fn clean_capacity(mut self, gallons: f64) -> Self {
        self.fleet.trucks[0].clean_capacity_gallons = Some(gallons);
        self
    }

    pub fn carrying(mut self, gallons: f64) -> Self {
        self.fleet.trucks[0].current_waste_gallons = gallons;
        self
    }

    pub fn trailer(mut self, spots: u32) -> Self {
        let id = TrailerId(self.fleet.trailers.len() as u64 + 1);
        self.fleet.trailers.push(Trailer {
            id,
            tenant: TENANT,
            spot_capacity: Some(spots),
            preference_rank: None,
        });
        self
    }

    pub fn without_dump_sites(mut self) -> Self {
        self.fleet.dump_sites.clear();
        self
    }

    pub fn build(self) -> Fleet {
        self.fleet
    }
}

pub fn order(id: u64, site: &Site, delivery: NaiveDate, pickup: Option<NaiveDate>) -> Order {
    Order {
        id: OrderId(id),
        tenant: TENANT,
        site: site.location(),
        delivery_date: delivery,
        pickup_date: pickup,
        service_interval_days: Some(7),
        quantities: UnitQuantities::from([(STANDARD, 3), (WASH_STATION, 1)]),
    }
}

/// Store a plan as a route on the fleet's preferred truck and trailer.
///
/// Virtual stops are dropped; capacity enforcement materializes them.
pub fn persist_plan(store: &mut MemoryStore, fleet: &Fleet, plan: &RoutePlan) -> RouteId {
    RouteAssigner::new(fleet)
        .commit_plan(store, TENANT, plan, &RoutingSettings::default())
        .unwrap()
        .expect("fixture fleet has a truck")
}
