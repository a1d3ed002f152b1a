//! Generation of an order's delivery, service and pickup events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Days, NaiveDate};
use tracing::info;

use crate::assignment::RouteAssigner;
use crate::batching::{Batch, delivery_batches, pickup_batches};
use crate::config::{GenerationSettings, WriteContext};
use crate::error::Result;
use crate::model::{
    BatchTag, EventId, EventStatus, EventType, Fleet, Order, OrderId, ServiceEvent, UnitCatalog,
};
use crate::traits::EventStore;

/// One exclusive lock per order, held across delete-then-recreate.
///
/// Entries live only while some regeneration holds or waits on them.
#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `order`. Hold its guard for the whole regeneration.
    pub fn handle(&self, order: OrderId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(order).or_default().clone()
    }

    /// Forget the lock for `order` once nobody outside the map holds it.
    pub fn release(&self, order: OrderId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&order)
            .is_some_and(|handle| Arc::strong_count(handle) == 1)
        {
            locks.remove(&order);
        }
    }

    /// Orders with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct EventGenerator<'a> {
    catalog: &'a UnitCatalog,
    fleet: &'a Fleet,
    settings: &'a GenerationSettings,
    locks: &'a OrderLocks,
}

impl<'a> EventGenerator<'a> {
    pub fn new(
        catalog: &'a UnitCatalog,
        fleet: &'a Fleet,
        settings: &'a GenerationSettings,
        locks: &'a OrderLocks,
    ) -> Self {
        Self {
            catalog,
            fleet,
            settings,
            locks,
        }
    }

    /// The events `order` should have, without touching storage.
    pub fn planned_events(&self, order: &Order) -> Result<Vec<ServiceEvent>> {
        let capacities = self.fleet.trailer_capacities();
        let mut events = Vec::new();

        for batch in delivery_batches(&order.quantities, self.catalog, &capacities)? {
            let date = order.delivery_date;
            events.push(self.batch_event(order, EventType::Delivery, date, batch));
        }

        if let Some(interval) = order.service_interval_days.filter(|days| *days > 0) {
            let end = order.pickup_date.unwrap_or_else(|| {
                add_days(order.delivery_date, self.settings.open_ended_service_days)
            });
            let mut date = add_days(order.delivery_date, interval);
            while date < end {
                let mut service = self.order_event(order, EventType::Service, date);
                service.quantities = order.quantities.clone();
                events.push(service);
                date = add_days(date, interval);
            }
        }

        if let Some(pickup_date) = order.pickup_date {
            for batch in pickup_batches(&order.quantities, self.catalog, &capacities)? {
                let event = self.batch_event(order, EventType::Pickup, pickup_date, batch);
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Replace the order's generated, still-scheduled events with a fresh set.
    ///
    /// Completed and skipped events stay and are not generated again. The
    /// order lock spans the delete and the rebuild.
    pub fn regenerate<S: EventStore>(
        &self,
        store: &mut S,
        order: &Order,
        context: WriteContext,
    ) -> Result<Vec<EventId>> {
        let handle = self.locks.handle(order.id);
        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            self.regenerate_locked(store, order, context)
        };
        drop(handle);
        self.locks.release(order.id);
        result
    }

    fn regenerate_locked<S: EventStore>(
        &self,
        store: &mut S,
        order: &Order,
        context: WriteContext,
    ) -> Result<Vec<EventId>> {
        let planned = self.planned_events(order)?;
        let existing = store.order_events(order.id);

        let mut settled = Vec::new();
        let mut removed = 0;
        for event in existing {
            if event.status != EventStatus::Scheduled {
                settled.push((event.event_type, event.scheduled_date, event.batch));
            } else if event.auto_generated {
                store.delete_event(event.id)?;
                removed += 1;
            }
        }

        let assigner = RouteAssigner::new(self.fleet);
        let mut created = Vec::new();
        for event in planned {
            if settled.contains(&(event.event_type, event.scheduled_date, event.batch)) {
                continue;
            }
            let id = store.insert_event(event)?;
            if context.auto_assign {
                assigner.assign(store, id)?;
            }
            created.push(id);
        }

        info!(
            "Regenerated order {}: removed {}, created {}, kept {} settled",
            order.id,
            removed,
            created.len(),
            settled.len()
        );
        Ok(created)
    }

    /// Regenerate many orders with auto-assignment suppressed.
    ///
    /// Returns every created id so the caller can plan them in one pass.
    pub fn backfill<S: EventStore>(
        &self,
        store: &mut S,
        orders: &[Order],
    ) -> Result<Vec<EventId>> {
        let mut created = Vec::new();
        for order in orders {
            created.extend(self.regenerate(store, order, WriteContext::bulk())?);
        }
        info!(
            "Backfilled {} orders with {} events",
            orders.len(),
            created.len()
        );
        Ok(created)
    }

    fn order_event(&self, order: &Order, event_type: EventType, date: NaiveDate) -> ServiceEvent {
        let mut event = ServiceEvent::new(order.tenant, event_type, date);
        event.order_id = Some(order.id);
        event.site = Some(order.site);
        event.auto_generated = true;
        event
    }

    fn batch_event(
        &self,
        order: &Order,
        event_type: EventType,
        date: NaiveDate,
        batch: Batch,
    ) -> ServiceEvent {
        let mut event = self.order_event(order, event_type, date);
        event.quantities = batch.quantities;
        event.batch = Some(BatchTag {
            sequence: batch.sequence,
            total: batch.total,
        });
        event
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
