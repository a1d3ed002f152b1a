//! Read-only capacity replay of a fixed stop order.

use serde::Serialize;

use crate::error::Result;
use crate::model::{EventId, EventType, ServiceEvent, Trailer, Truck, UnitCatalog};
use crate::resources::resource_usage;

/// Capacities a route is checked against. `None` means unknown: never flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteCapacities {
    pub waste_gallons: Option<f64>,
    pub clean_gallons: Option<f64>,
    pub trailer_spots: Option<u32>,
}

impl RouteCapacities {
    pub fn new(truck: Option<&Truck>, trailer: Option<&Trailer>) -> Self {
        Self {
            waste_gallons: truck.and_then(|t| t.waste_capacity_gallons),
            clean_gallons: truck.and_then(|t| t.clean_capacity_gallons),
            trailer_spots: trailer.and_then(|t| t.spot_capacity),
        }
    }
}

/// Running totals right after one stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopSnapshot {
    pub step: usize,
    pub event_id: EventId,
    pub event_type: EventType,
    pub waste_used: f64,
    pub clean_used: f64,
    pub trailer_used: u32,
    pub waste_over: bool,
    pub clean_over: bool,
    pub trailer_over: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StopSnapshot>,
    pub violations: Vec<String>,
    /// Waste on board after the last stop.
    pub final_waste: f64,
}

impl SimulationReport {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

pub struct CapacitySimulator<'a> {
    catalog: &'a UnitCatalog,
    capacities: RouteCapacities,
}

impl<'a> CapacitySimulator<'a> {
    pub fn new(catalog: &'a UnitCatalog, capacities: RouteCapacities) -> Self {
        Self {
            catalog,
            capacities,
        }
    }

    /// Walk `stops` once starting with `starting_waste` on board.
    ///
    /// A counter is flagged only when it strictly exceeds a known capacity.
    pub fn simulate(
        &self,
        stops: &[ServiceEvent],
        starting_waste: f64,
    ) -> Result<SimulationReport> {
        let capacities = self.capacities;
        let mut report = SimulationReport::default();
        let mut waste = starting_waste;
        let mut clean = 0.0;
        let mut trailer = 0u32;
        let mut last_waste_ok: Option<(usize, EventId)> = None;

        for (step, stop) in stops.iter().enumerate() {
            match stop.event_type {
                EventType::Dump => waste = 0.0,
                EventType::Refill => {
                    clean = 0.0;
                    trailer = 0;
                }
                _ => {
                    let usage = resource_usage(stop, self.catalog)?;
                    waste += usage.waste_gallons;
                    clean += usage.clean_water_gallons;
                    trailer += usage.trailer_spots;
                }
            }

            let waste_over = capacities.waste_gallons.is_some_and(|cap| waste > cap);
            let clean_over = capacities.clean_gallons.is_some_and(|cap| clean > cap);
            let trailer_over = capacities.trailer_spots.is_some_and(|cap| trailer > cap);
            let label = format!("Stop {} ({} event {})", step + 1, stop.event_type, stop.id);

            if let (true, Some(cap)) = (waste_over, capacities.waste_gallons) {
                let hint = match last_waste_ok {
                    Some((ok_step, ok_id)) => {
                        format!("dump after stop {} (event {})", ok_step + 1, ok_id)
                    }
                    None => "dump before the first stop".to_string(),
                };
                report.violations.push(format!(
                    "{}: waste {:.1} gal exceeds capacity {:.1} gal; {}",
                    label, waste, cap, hint
                ));
            } else {
                last_waste_ok = Some((step, stop.id));
            }
            if let (true, Some(cap)) = (clean_over, capacities.clean_gallons) {
                report.violations.push(format!(
                    "{}: clean water {:.1} gal exceeds capacity {:.1} gal",
                    label, clean, cap
                ));
            }
            if let (true, Some(cap)) = (trailer_over, capacities.trailer_spots) {
                report.violations.push(format!(
                    "{}: trailer load {} spots exceeds capacity {} spots",
                    label, trailer, cap
                ));
            }

            report.steps.push(StopSnapshot {
                step,
                event_id: stop.id,
                event_type: stop.event_type,
                waste_used: waste,
                clean_used: clean,
                trailer_used: trailer,
                waste_over,
                clean_over,
                trailer_over,
            });
        }

        report.final_waste = waste;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{Draw, TenantId, UnitCategory, UnitRates, UnitType, UnitTypeId};

    fn catalog() -> UnitCatalog {
        UnitCatalog::new([UnitType {
            id: UnitTypeId(1),
            name: "standard".into(),
            category: UnitCategory::Standard,
            rates: UnitRates {
                delivery: Draw {
                    clean_gallons: 5.0,
                    waste_gallons: 0.0,
                },
                service: Draw {
                    clean_gallons: 10.0,
                    waste_gallons: 40.0,
                },
                pickup: Draw {
                    clean_gallons: 0.0,
                    waste_gallons: 20.0,
                },
            },
        }])
    }

    fn stop(id: u64, event_type: EventType, units: u32) -> ServiceEvent {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut event = ServiceEvent::new(TenantId(1), event_type, date);
        event.id = EventId(id);
        if units > 0 {
            event.quantities.insert(UnitTypeId(1), units);
        }
        event
    }

    fn capacities() -> RouteCapacities {
        RouteCapacities {
            waste_gallons: Some(100.0),
            clean_gallons: Some(50.0),
            trailer_spots: Some(2),
        }
    }

    #[test]
    fn test_exact_capacity_is_not_a_violation() {
        let catalog = catalog();
        let stops = [
            stop(1, EventType::Service, 1),
            stop(2, EventType::Service, 1),
        ];
        let report = CapacitySimulator::new(&catalog, capacities())
            .simulate(&stops, 20.0)
            .unwrap();
        assert_eq!(report.steps[1].waste_used, 100.0);
        assert!(report.is_feasible());
    }

    #[test]
    fn test_waste_violation_names_last_good_stop() {
        let catalog = catalog();
        let stops = [
            stop(1, EventType::Service, 1),
            stop(2, EventType::Service, 1),
            stop(3, EventType::Service, 1),
        ];
        let report = CapacitySimulator::new(&catalog, capacities())
            .simulate(&stops, 0.0)
            .unwrap();
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("Stop 3"));
        assert!(report.violations[0].contains("dump after stop 2 (event 2)"));
        assert!(report.steps[2].waste_over);
    }

    #[test]
    fn test_dump_resets_waste() {
        let catalog = catalog();
        let report = CapacitySimulator::new(&catalog, capacities())
            .simulate(
                &[
                    stop(1, EventType::Service, 2),
                    stop(2, EventType::Dump, 0),
                    stop(3, EventType::Service, 1),
                ],
                0.0,
            )
            .unwrap();
        assert_eq!(report.steps[1].waste_used, 0.0);
        assert_eq!(report.final_waste, 40.0);
    }

    #[test]
    fn test_trailer_and_clean_violations() {
        let catalog = catalog();
        let capacities = RouteCapacities {
            waste_gallons: None,
            ..capacities()
        };
        let stops = [
            stop(1, EventType::Delivery, 3),
            stop(2, EventType::Service, 4),
        ];
        let report = CapacitySimulator::new(&catalog, capacities)
            .simulate(&stops, 0.0)
            .unwrap();
        assert!(report.steps[0].trailer_over);
        assert!(report.steps[1].clean_over);
        assert_eq!(report.violations.len(), 3);
    }

    #[test]
    fn test_unknown_capacity_never_flags() {
        let catalog = catalog();
        let stops = [
            stop(1, EventType::Service, 50),
            stop(2, EventType::Pickup, 50),
        ];
        let report = CapacitySimulator::new(&catalog, RouteCapacities::default())
            .simulate(&stops, 0.0)
            .unwrap();
        assert!(report.is_feasible());
        assert_eq!(report.steps.len(), 2);
    }

    #[test]
    fn test_waste_over_from_the_start_hints_first_stop() {
        let catalog = catalog();
        let report = CapacitySimulator::new(&catalog, capacities())
            .simulate(&[stop(1, EventType::Service, 1)], 90.0)
            .unwrap();
        assert!(report.violations[0].contains("dump before the first stop"));
    }
}
