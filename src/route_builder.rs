//! Greedy route construction for one cluster.
//!
//! Candidates are sequenced one at a time by a weighted nearest-first score.
//! Virtual dump and home-base stops are inserted whenever the truck's waste
//! tank, clean-water tank or trailer would overflow. The builder is a
//! heuristic: tie-breaks and thresholds are part of its contract.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::candidates::Candidate;
use crate::config::RoutingSettings;
use crate::distance::DistanceLookup;
use crate::error::{PlannerError, Result};
use crate::model::{EventId, EventType, Fleet, Location};
use crate::traits::DistanceCacheStore;

/// Resource state of the truck and trailer used for a planning run.
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    /// Waste already on board when the run starts.
    pub truck_waste_baseline: f64,
    pub clean_capacity: Option<f64>,
    pub waste_capacity: Option<f64>,
    pub trailer_capacity: Option<u32>,
    pub home_base: Option<Location>,
    pub dump_sites: Vec<Location>,
}

impl FleetState {
    /// Snapshot the preferred truck and trailer of `fleet`.
    pub fn from_fleet(fleet: &Fleet) -> Self {
        let truck = fleet.preferred_truck();
        let trailer = fleet.preferred_trailer();
        if trailer.is_none() {
            warn!(
                "Tenant {} has no trailer; trailer capacity is unconstrained",
                fleet.tenant
            );
        }

        Self {
            truck_waste_baseline: truck.map_or(0.0, |t| t.current_waste_gallons),
            clean_capacity: truck.and_then(|t| t.clean_capacity_gallons),
            waste_capacity: truck.and_then(|t| t.waste_capacity_gallons),
            trailer_capacity: trailer.and_then(|t| t.spot_capacity),
            home_base: fleet.home_base,
            dump_sites: fleet.dump_sites.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualKind {
    Dump,
    HomeBase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Waste carried in from earlier work already sits at the threshold.
    CarriedWaste,
    /// The next stop would take waste over the threshold.
    WasteThreshold,
    /// The next stop would run the clean-water tank dry.
    CleanWaterRefill,
    /// The next stop would overfill the trailer.
    TrailerReload,
}

/// A depot stop that is not backed by a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VirtualStop {
    pub kind: VirtualKind,
    pub location: Location,
    pub reason: StopReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStop {
    Event(Candidate),
    Virtual(VirtualStop),
}

impl PlannedStop {
    pub fn location(&self) -> &Location {
        match self {
            PlannedStop::Event(candidate) => &candidate.location,
            PlannedStop::Virtual(stop) => &stop.location,
        }
    }

    fn is_dump(&self) -> bool {
        matches!(
            self,
            PlannedStop::Virtual(VirtualStop {
                kind: VirtualKind::Dump,
                ..
            })
        )
    }
}

/// One dated itinerary produced by the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub date: NaiveDate,
    pub stops: Vec<PlannedStop>,
    /// Sum of known leg distances starting from the home base.
    pub drive_km: f64,
    /// Known drive distance on arrival at each stop, parallel to `stops`.
    pub arrival_km: Vec<f64>,
    pub unknown_legs: usize,
}

impl RoutePlan {
    pub fn event_ids(&self) -> Vec<EventId> {
        self.stops
            .iter()
            .filter_map(|stop| match stop {
                PlannedStop::Event(candidate) => Some(candidate.event_id),
                PlannedStop::Virtual(_) => None,
            })
            .collect()
    }

    pub fn virtual_stops(&self) -> impl Iterator<Item = &VirtualStop> {
        self.stops.iter().filter_map(|stop| match stop {
            PlannedStop::Virtual(virtual_stop) => Some(virtual_stop),
            PlannedStop::Event(_) => None,
        })
    }
}

/// The route currently being filled.
#[derive(Debug)]
struct RouteState {
    stops: Vec<PlannedStop>,
    delivered_spots: u32,
    picked_spots: u32,
    clean_used: f64,
    last_location: Option<Location>,
    date: Option<NaiveDate>,
    placed: bool,
}

impl RouteState {
    fn new(home_base: Option<Location>) -> Self {
        Self {
            stops: Vec::new(),
            delivered_spots: 0,
            picked_spots: 0,
            clean_used: 0.0,
            last_location: home_base,
            date: None,
            placed: false,
        }
    }

    /// Trailer spots the route needs: all deliveries loaded plus all pickups.
    fn trailer_used(&self) -> u32 {
        self.delivered_spots + self.picked_spots
    }

    fn ends_with_dump(&self) -> bool {
        self.stops.last().is_some_and(PlannedStop::is_dump)
    }
}

/// Why a route is closed early in favour of a fresh one.
enum Blocked {
    CleanWater,
    Trailer,
}

pub struct RouteBuilder<'a, C: DistanceCacheStore> {
    settings: &'a RoutingSettings,
    fleet: &'a FleetState,
    distances: &'a DistanceLookup<'a, C>,
}

impl<'a, C: DistanceCacheStore> RouteBuilder<'a, C> {
    pub fn new(
        settings: &'a RoutingSettings,
        fleet: &'a FleetState,
        distances: &'a DistanceLookup<'a, C>,
    ) -> Self {
        Self {
            settings,
            fleet,
            distances,
        }
    }

    /// Sequence every candidate of `cluster` into one or more dated routes.
    ///
    /// Returns [`PlannerError::IterationCapExceeded`] if the loop fails to
    /// converge, which indicates a defect rather than bad input.
    pub fn build(&self, cluster: Vec<Candidate>, start: NaiveDate) -> Result<Vec<RoutePlan>> {
        let cluster_size = cluster.len();
        let cap = self.settings.iteration_cap(cluster_size);
        let threshold = self.settings.dump_threshold(self.fleet.waste_capacity);
        if threshold.is_some() && self.fleet.dump_sites.is_empty() {
            warn!("No dump site configured; waste threshold cannot be enforced");
        }

        let mut remaining = cluster;
        let mut date = start;
        let mut waste = self.fleet.truck_waste_baseline;
        let mut iterations = 0usize;
        let mut placed_total = 0usize;
        let mut plans = Vec::new();
        let mut route = RouteState::new(self.fleet.home_base);

        while !remaining.is_empty() {
            iterations += 1;
            if iterations > cap {
                error!(
                    "Route builder exceeded {} iterations on a cluster of {} ({} placed)",
                    cap, cluster_size, placed_total
                );
                return Err(PlannerError::IterationCapExceeded {
                    cap,
                    cluster_size,
                    placed: placed_total,
                });
            }

            if !route.placed
                && !route.ends_with_dump()
                && threshold.is_some_and(|limit| waste > 0.0 && waste >= limit)
            {
                self.insert_dump(&mut route, &mut waste, StopReason::CarriedWaste);
            }

            let Some(index) = self.next_candidate(&remaining, &route, date, waste) else {
                if route.placed {
                    debug!("Nothing eligible on {}; closing route", date);
                    plans.push(self.finish(route));
                    route = RouteState::new(self.fleet.home_base);
                    continue;
                }

                let next_date = remaining.iter().map(|c| c.due_date).min().unwrap_or(date);
                if next_date != date {
                    debug!("Nothing eligible on {}; advancing to {}", date, next_date);
                    date = next_date;
                    continue;
                }

                // Forced progress: no date change can make anything eligible.
                let index = earliest_due(&remaining);
                warn!(
                    "Forcing blocked event {} onto an empty route",
                    remaining[index].event_id
                );
                let candidate = remaining.remove(index);
                date = candidate.due_date;
                self.accept(&mut route, &mut waste, &mut date, candidate, threshold);
                placed_total += 1;
                continue;
            };

            let usage = remaining[index].usage;
            if threshold.is_some_and(|limit| waste > 0.0 && waste + usage.waste_gallons > limit) {
                self.insert_dump(&mut route, &mut waste, StopReason::WasteThreshold);
            }

            if let Some(blocked) = self.blocked_by(&route, &remaining[index]) {
                if route.placed {
                    let reason = match blocked {
                        Blocked::CleanWater => StopReason::CleanWaterRefill,
                        Blocked::Trailer => StopReason::TrailerReload,
                    };
                    self.return_home(&mut route, reason);
                    plans.push(self.finish(route));
                    route = RouteState::new(self.fleet.home_base);
                    continue;
                }
                // Escape valve: a lone stop over capacity still goes out so
                // the route makes progress.
                warn!(
                    "Event {} exceeds capacity on its own; accepting it as the first stop",
                    remaining[index].event_id
                );
            }

            let candidate = remaining.remove(index);
            self.accept(&mut route, &mut waste, &mut date, candidate, threshold);
            placed_total += 1;
        }

        if route.placed {
            plans.push(self.finish(route));
        }

        info!(
            "Built {} routes for a cluster of {} in {} iterations",
            plans.len(),
            cluster_size,
            iterations
        );
        Ok(plans)
    }

    /// Index of the best eligible candidate, lowest score first, earliest
    /// listed on ties.
    fn next_candidate(
        &self,
        remaining: &[Candidate],
        route: &RouteState,
        date: NaiveDate,
        waste: f64,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in remaining.iter().enumerate() {
            if !self.eligible(candidate, date) {
                continue;
            }
            let score = self.score(candidate, route, date, waste);
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    fn eligible(&self, candidate: &Candidate, date: NaiveDate) -> bool {
        match candidate.event_type {
            EventType::Pickup => candidate.due_date == date,
            EventType::Delivery => candidate.due_date >= date,
            EventType::Service => {
                let horizon_end = date
                    .checked_add_days(Days::new(u64::from(self.settings.horizon_days)))
                    .unwrap_or(NaiveDate::MAX);
                candidate.due_date <= horizon_end
            }
            EventType::Dump | EventType::Refill => false,
        }
    }

    fn score(&self, candidate: &Candidate, route: &RouteState, date: NaiveDate, waste: f64) -> f64 {
        let from_last = self.distance_from(route.last_location.as_ref(), &candidate.location);
        let from_home = self.distance_from(self.fleet.home_base.as_ref(), &candidate.location);
        let day_gap = (candidate.due_date - date).num_days().abs() as f64;

        let mut score = from_last + day_gap + from_home / self.settings.home_distance_divisor;

        if let Some(capacity) = self.fleet.waste_capacity {
            if capacity - waste <= self.settings.dump_bias_headroom * capacity {
                let dump = self
                    .distances
                    .nearest(&candidate.location, &self.fleet.dump_sites);
                if let Some(dump) = dump {
                    let to_dump = self.distances.score_distance(&candidate.location, dump);
                    score += self.settings.bias_weight * to_dump;
                }
            }
        }

        if let Some(capacity) = self.fleet.trailer_capacity {
            let headroom = f64::from(capacity) - f64::from(route.trailer_used());
            if headroom <= self.settings.home_bias_headroom * f64::from(capacity) {
                score += self.settings.bias_weight * from_home;
            }
        }

        score
    }

    fn distance_from(&self, from: Option<&Location>, to: &Location) -> f64 {
        match from {
            Some(from) => self.distances.score_distance(from, to),
            None => crate::distance::UNKNOWN_DISTANCE_KM,
        }
    }

    /// Whether accepting `candidate` would overflow clean water or trailer.
    fn blocked_by(&self, route: &RouteState, candidate: &Candidate) -> Option<Blocked> {
        if let Some(capacity) = self.fleet.clean_capacity {
            if route.clean_used + candidate.usage.clean_water_gallons > capacity {
                return Some(Blocked::CleanWater);
            }
        }
        if candidate.event_type.moves_units() {
            if let Some(capacity) = self.fleet.trailer_capacity {
                if route.trailer_used() + candidate.usage.trailer_spots > capacity {
                    return Some(Blocked::Trailer);
                }
            }
        }
        None
    }

    fn accept(
        &self,
        route: &mut RouteState,
        waste: &mut f64,
        date: &mut NaiveDate,
        candidate: Candidate,
        threshold: Option<f64>,
    ) {
        *waste += candidate.usage.waste_gallons;
        route.clean_used += candidate.usage.clean_water_gallons;
        match candidate.event_type {
            EventType::Delivery => {
                route.delivered_spots += candidate.usage.trailer_spots;
                if candidate.due_date < *date {
                    *date = candidate.due_date;
                }
            }
            EventType::Pickup => {
                route.picked_spots += candidate.usage.trailer_spots;
                *date = candidate.due_date;
            }
            _ => {}
        }

        route.date.get_or_insert(*date);
        route.last_location = Some(candidate.location);
        route.placed = true;
        route.stops.push(PlannedStop::Event(candidate));

        if threshold.is_some_and(|limit| *waste >= limit) {
            self.insert_dump(route, waste, StopReason::WasteThreshold);
        }
    }

    fn insert_dump(&self, route: &mut RouteState, waste: &mut f64, reason: StopReason) {
        let from = route.last_location.or(self.fleet.home_base);
        let site = match from {
            Some(from) => self.distances.nearest(&from, &self.fleet.dump_sites),
            None => self.fleet.dump_sites.first(),
        };
        let Some(site) = site else {
            debug!(
                "No dump site available; carrying {} gallons of waste",
                waste
            );
            return;
        };

        debug!(
            "Inserting dump at {} with {} gallons on board",
            site.id, waste
        );
        route.stops.push(PlannedStop::Virtual(VirtualStop {
            kind: VirtualKind::Dump,
            location: *site,
            reason,
        }));
        route.last_location = Some(*site);
        *waste = 0.0;
    }

    fn return_home(&self, route: &mut RouteState, reason: StopReason) {
        match self.fleet.home_base {
            Some(home) => {
                debug!("Returning home for {:?}", reason);
                route.stops.push(PlannedStop::Virtual(VirtualStop {
                    kind: VirtualKind::HomeBase,
                    location: home,
                    reason,
                }));
                route.clean_used = 0.0;
            }
            None => warn!(
                "No home base configured; closing route without a {:?} stop",
                reason
            ),
        }
    }

    fn finish(&self, route: RouteState) -> RoutePlan {
        let mut stops = route.stops;
        reorder_for_dump(&mut stops, self.distances);

        let mut drive_km = 0.0;
        let mut arrival_km = Vec::with_capacity(stops.len());
        let mut unknown_legs = 0;
        let mut previous = self.fleet.home_base;
        for stop in &stops {
            match previous.and_then(|from| self.distances.distance(&from, stop.location())) {
                Some(km) => drive_km += km,
                None => unknown_legs += 1,
            }
            arrival_km.push(drive_km);
            previous = Some(*stop.location());
        }

        RoutePlan {
            date: route.date.unwrap_or(NaiveDate::MIN),
            stops,
            drive_km,
            arrival_km,
            unknown_legs,
        }
    }
}

fn earliest_due(remaining: &[Candidate]) -> usize {
    remaining
        .iter()
        .enumerate()
        .min_by_key(|(index, candidate)| (candidate.due_date, *index))
        .map_or(0, |(index, _)| index)
}

/// Re-sort the run of event stops leading into each dump so the truck works
/// toward the dump: farthest first, nearest last, original order on ties.
pub fn reorder_for_dump<C: DistanceCacheStore>(
    stops: &mut [PlannedStop],
    distances: &DistanceLookup<'_, C>,
) {
    for dump_index in 0..stops.len() {
        let PlannedStop::Virtual(VirtualStop {
            kind: VirtualKind::Dump,
            location: dump_site,
            ..
        }) = stops[dump_index]
        else {
            continue;
        };

        let mut start = dump_index;
        while start > 0 && matches!(stops[start - 1], PlannedStop::Event(_)) {
            start -= 1;
        }
        if dump_index - start < 2 {
            continue;
        }

        let mut run: Vec<(f64, PlannedStop)> = stops[start..dump_index]
            .iter()
            .map(|stop| {
                let km = distances.score_distance(stop.location(), &dump_site);
                (km, stop.clone())
            })
            .collect();
        run.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (offset, (_, stop)) in run.into_iter().enumerate() {
            stops[start + offset] = stop;
        }
    }
}
