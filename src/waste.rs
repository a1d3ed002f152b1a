//! Waste carried by each truck across its routes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::capacity_simulator::{CapacitySimulator, RouteCapacities};
use crate::error::Result;
use crate::model::{Fleet, Route, RouteId, TruckId, UnitCatalog};
use crate::traits::EventStore;

/// Waste on a truck after it finishes one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteWaste {
    pub route_id: RouteId,
    pub truck_id: TruckId,
    pub date: NaiveDate,
    /// Waste on board at the end of the route, counting only what was
    /// collected since the last dump.
    pub cumulative_used: f64,
    pub capacity: Option<f64>,
    /// Capacity left, floored at zero. `None` when capacity is unknown.
    pub remaining: Option<f64>,
    pub over_capacity: bool,
}

pub struct WasteTracker<'a> {
    catalog: &'a UnitCatalog,
    fleet: &'a Fleet,
}

impl<'a> WasteTracker<'a> {
    pub fn new(catalog: &'a UnitCatalog, fleet: &'a Fleet) -> Self {
        Self { catalog, fleet }
    }

    /// Replay `routes` per truck in date order, carrying waste from one route
    /// to the next until a dump empties the tank.
    ///
    /// Each truck starts from its persisted waste load. Records come back
    /// ordered by truck, then date, then route id.
    pub fn track<S: EventStore>(&self, store: &S, routes: &[Route]) -> Result<Vec<RouteWaste>> {
        let mut by_truck: BTreeMap<TruckId, Vec<&Route>> = BTreeMap::new();
        for route in routes {
            by_truck.entry(route.truck_id).or_default().push(route);
        }

        let mut records = Vec::with_capacity(routes.len());
        for (truck_id, mut truck_routes) in by_truck {
            truck_routes.sort_by_key(|route| (route.date, route.id));

            let truck = self.fleet.truck(truck_id);
            let capacities = RouteCapacities::new(truck, None);
            let simulator = CapacitySimulator::new(self.catalog, capacities);
            let mut carried = truck.map_or(0.0, |t| t.current_waste_gallons).max(0.0);

            for route in truck_routes {
                let stops = store.route_events(route.id)?;
                carried = simulator.simulate(&stops, carried)?.final_waste.max(0.0);

                let capacity = capacities.waste_gallons;
                records.push(RouteWaste {
                    route_id: route.id,
                    truck_id,
                    date: route.date,
                    cumulative_used: carried,
                    capacity,
                    remaining: capacity.map(|cap| (cap - carried).max(0.0)),
                    over_capacity: capacity.is_some_and(|cap| carried > cap),
                });
            }
            debug!(
                "Truck {} ends tracking with {:.1} gal of waste",
                truck_id, carried
            );
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType::{Dump, Service};
    use crate::model::{
        Draw, EventType, Location, ServiceEvent, TenantId, Truck, UnitCategory, UnitRates,
        UnitType, UnitTypeId,
    };
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn catalog() -> UnitCatalog {
        UnitCatalog::new([UnitType {
            id: UnitTypeId(1),
            name: "standard".into(),
            category: UnitCategory::Standard,
            rates: UnitRates {
                service: Draw {
                    clean_gallons: 0.0,
                    waste_gallons: 30.0,
                },
                ..UnitRates::default()
            },
        }])
    }

    fn fleet(baseline: f64) -> Fleet {
        Fleet {
            tenant: TenantId(1),
            trucks: vec![Truck {
                id: TruckId(1),
                tenant: TenantId(1),
                clean_capacity_gallons: None,
                waste_capacity_gallons: Some(100.0),
                current_waste_gallons: baseline,
                preference_rank: None,
            }],
            ..Fleet::default()
        }
    }

    fn route(store: &mut MemoryStore, date: NaiveDate, stops: &[EventType]) -> Route {
        let route_id = store
            .insert_route(Route {
                id: RouteId(0),
                tenant: TenantId(1),
                date,
                truck_id: TruckId(1),
                trailer_id: None,
                optimization_stale: false,
                drive_km: None,
                drive_minutes: None,
            })
            .unwrap();
        for (position, event_type) in stops.iter().enumerate() {
            let event = match event_type {
                EventType::Dump => {
                    let site = Location::new(9, 43.0, -90.0);
                    ServiceEvent::depot_stop(TenantId(1), EventType::Dump, date, site)
                }
                _ => {
                    let mut event = ServiceEvent::new(TenantId(1), *event_type, date);
                    event.quantities.insert(UnitTypeId(1), 1);
                    event
                }
            };
            let id = store.insert_event(event).unwrap();
            store.assign_event(id, route_id, position as u32).unwrap();
        }
        store.route(route_id).unwrap()
    }

    #[test]
    fn test_waste_carries_between_routes_in_date_order() {
        let mut store = MemoryStore::new();
        let later = route(&mut store, day(4), &[Service, Service]);
        let earlier = route(&mut store, day(3), &[Service]);
        let catalog = catalog();
        let fleet = fleet(10.0);

        let records = WasteTracker::new(&catalog, &fleet)
            .track(&store, &[later, earlier])
            .unwrap();

        assert_eq!(records[0].date, day(3));
        assert_eq!(records[0].cumulative_used, 40.0);
        assert_eq!(records[1].cumulative_used, 100.0);
        assert_eq!(records[1].remaining, Some(0.0));
        assert!(!records[1].over_capacity);
    }

    #[test]
    fn test_dump_resets_carried_waste() {
        let mut store = MemoryStore::new();
        let first = route(&mut store, day(3), &[Service, Service]);
        let second = route(&mut store, day(4), &[Service, Dump, Service]);
        let catalog = catalog();
        let fleet = fleet(0.0);

        let records = WasteTracker::new(&catalog, &fleet)
            .track(&store, &[first, second])
            .unwrap();

        assert_eq!(records[0].cumulative_used, 60.0);
        assert_eq!(records[1].cumulative_used, 30.0);
        assert_eq!(records[1].remaining, Some(70.0));
    }

    #[test]
    fn test_over_capacity_is_flagged_and_remaining_floors_at_zero() {
        let mut store = MemoryStore::new();
        let only = route(&mut store, day(3), &[Service, Service]);
        let catalog = catalog();
        let fleet = fleet(50.0);

        let records = WasteTracker::new(&catalog, &fleet)
            .track(&store, &[only])
            .unwrap();

        assert_eq!(records[0].cumulative_used, 110.0);
        assert!(records[0].over_capacity);
        assert_eq!(records[0].remaining, Some(0.0));
    }
}
