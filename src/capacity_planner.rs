//! Capacity enforcement on a stored route: materializes dump and refill stops.

use tracing::{info, warn};

use crate::capacity_simulator::RouteCapacities;
use crate::error::Result;
use crate::model::{EventId, EventType, Fleet, Route, RouteId, ServiceEvent, UnitCatalog};
use crate::resources::resource_usage;
use crate::traits::EventStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityPlanOutcome {
    pub inserted: Vec<EventId>,
    /// Auto-generated depot stops removed from a previous run.
    pub removed: Vec<EventId>,
    pub warnings: Vec<String>,
}

pub struct CapacityPlanner<'a> {
    catalog: &'a UnitCatalog,
    fleet: &'a Fleet,
}

impl<'a> CapacityPlanner<'a> {
    pub fn new(catalog: &'a UnitCatalog, fleet: &'a Fleet) -> Self {
        Self { catalog, fleet }
    }

    /// Replay the route's stops in order and insert a dump or refill stop
    /// before any stop that would overflow the truck or trailer.
    ///
    /// Earlier auto-generated depot stops are removed first, so running this
    /// twice leaves the same stops in place.
    pub fn enforce<S: EventStore>(
        &self,
        store: &mut S,
        route_id: RouteId,
    ) -> Result<CapacityPlanOutcome> {
        let route = store.route(route_id)?;
        let truck = self.fleet.truck(route.truck_id);
        let trailer = route.trailer_id.and_then(|id| self.fleet.trailer(id));
        let capacities = RouteCapacities::new(truck, trailer);

        let mut outcome = CapacityPlanOutcome::default();
        let (stale, stops): (Vec<ServiceEvent>, Vec<ServiceEvent>) = store
            .route_events(route_id)?
            .into_iter()
            .partition(|event| {
                event.auto_generated
                    && event.event_type.is_depot_stop()
                    && event.order_id.is_none()
            });
        for event in &stale {
            store.delete_event(event.id)?;
            outcome.removed.push(event.id);
        }
        if stops.is_empty() {
            // The route went away with its last depot stop.
            return Ok(outcome);
        }

        let mut waste = truck.map_or(0.0, |t| t.current_waste_gallons);
        let mut clean = 0.0;
        let mut trailer_load = 0u32;
        let mut sequence = Vec::with_capacity(stops.len());

        for (step, stop) in stops.iter().enumerate() {
            match stop.event_type {
                EventType::Dump => {
                    waste = 0.0;
                    sequence.push(stop.id);
                    continue;
                }
                EventType::Refill => {
                    clean = 0.0;
                    trailer_load = 0;
                    sequence.push(stop.id);
                    continue;
                }
                _ => {}
            }

            let usage = resource_usage(stop, self.catalog)?;
            let label = format!("Stop {} ({} event {})", step + 1, stop.event_type, stop.id);

            if capacities
                .waste_gallons
                .is_some_and(|cap| waste > 0.0 && waste + usage.waste_gallons > cap)
            {
                match self.fleet.dump_sites.first() {
                    Some(site) => {
                        let dump = ServiceEvent::depot_stop(
                            route.tenant,
                            EventType::Dump,
                            route.date,
                            *site,
                        );
                        let id = store.insert_event(dump)?;
                        sequence.push(id);
                        outcome.inserted.push(id);
                        waste = 0.0;
                    }
                    None => self.warn(
                        &mut outcome,
                        format!(
                            "{}: waste capacity exceeded but no dump site is configured",
                            label
                        ),
                    ),
                }
            }

            let clean_breach = capacities
                .clean_gallons
                .is_some_and(|cap| clean > 0.0 && clean + usage.clean_water_gallons > cap);
            let trailer_breach = stop.event_type.moves_units()
                && capacities
                    .trailer_spots
                    .is_some_and(|cap| {
                        trailer_load > 0 && trailer_load + usage.trailer_spots > cap
                    });
            if clean_breach || trailer_breach {
                match self.fleet.home_base {
                    Some(home) => {
                        let refill = ServiceEvent::depot_stop(
                            route.tenant,
                            EventType::Refill,
                            route.date,
                            home,
                        );
                        let id = store.insert_event(refill)?;
                        sequence.push(id);
                        outcome.inserted.push(id);
                        clean = 0.0;
                        trailer_load = 0;
                    }
                    None => self.warn(
                        &mut outcome,
                        format!(
                            "{}: capacity exceeded but no home base is configured",
                            label
                        ),
                    ),
                }
            }

            waste += usage.waste_gallons;
            clean += usage.clean_water_gallons;
            trailer_load += usage.trailer_spots;
            sequence.push(stop.id);
        }

        self.resequence(store, &route, &sequence)?;
        info!(
            "Capacity planning on route {}: {} stops inserted, {} removed, {} warnings",
            route_id,
            outcome.inserted.len(),
            outcome.removed.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    fn resequence<S: EventStore>(
        &self,
        store: &mut S,
        route: &Route,
        sequence: &[EventId],
    ) -> Result<()> {
        for (position, id) in sequence.iter().enumerate() {
            store.assign_event(*id, route.id, position as u32)?;
        }
        store.mark_route_stale(route.id)
    }

    fn warn(&self, outcome: &mut CapacityPlanOutcome, message: String) {
        warn!("{}", message);
        outcome.warnings.push(message);
    }
}
