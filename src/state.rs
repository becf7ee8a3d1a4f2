use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::geofence::CooldownCache;
use crate::events::EventPublisher;
use crate::models::batch::DispatchBatch;
use crate::models::courier::{Courier, CourierCapacity};
use crate::models::emergency::EmergencyDispatch;
use crate::models::escalation::Escalation;
use crate::models::order::DeliveryOrder;
use crate::models::override_log::OverrideLog;
use crate::models::tracking::TrackingEvent;
use crate::observability::metrics::Metrics;

/// All engine state. Couriers and orders are owned by the wider platform and
/// only mirrored here; batches, escalations, emergencies, override logs and
/// tracking events are created by this engine and append-mostly.
pub struct EngineState {
    pub couriers: DashMap<Uuid, Courier>,
    pub capacities: DashMap<Uuid, CourierCapacity>,
    pub orders: DashMap<Uuid, DeliveryOrder>,
    pub batches: DashMap<Uuid, DispatchBatch>,
    pub escalations: DashMap<Uuid, Escalation>,
    /// Escalation ids per order, newest last. The entry lock doubles as the
    /// per-order mutex that keeps escalation levels monotonic.
    pub escalations_by_order: DashMap<Uuid, Vec<Uuid>>,
    pub emergencies: DashMap<Uuid, EmergencyDispatch>,
    pub override_logs: DashMap<Uuid, OverrideLog>,
    pub tracking: DashMap<Uuid, Vec<TrackingEvent>>,
    pub cooldowns: CooldownCache,
    pub events: EventPublisher,
    pub metrics: Metrics,
}

impl EngineState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self {
            couriers: DashMap::new(),
            capacities: DashMap::new(),
            orders: DashMap::new(),
            batches: DashMap::new(),
            escalations: DashMap::new(),
            escalations_by_order: DashMap::new(),
            emergencies: DashMap::new(),
            override_logs: DashMap::new(),
            tracking: DashMap::new(),
            cooldowns: CooldownCache::new(),
            events: EventPublisher::new(event_buffer_size),
            metrics: Metrics::new(),
        }
    }

    /// Mirror a platform-owned courier into the engine.
    pub fn upsert_courier(&self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    /// Mirror a platform-owned order into the engine.
    pub fn upsert_order(&self, order: DeliveryOrder) {
        self.orders.insert(order.id, order);
    }

    pub fn append_tracking(&self, event: TrackingEvent) {
        self.tracking.entry(event.order_id).or_default().push(event);
    }

    pub fn tracking_for(&self, order_id: Uuid) -> Vec<TrackingEvent> {
        self.tracking
            .get(&order_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }
}
