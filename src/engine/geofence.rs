use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::DispatchError;
use crate::events;
use crate::geo::haversine_m;
use crate::models::courier::GeoPoint;
use crate::models::order::{DeliveryOrder, OrderStatus};
use crate::models::tracking::TrackingEvent;
use crate::state::EngineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GeofenceEvent {
    PickupArrival,
    PickupNearby,
    DeliveryArrival,
    DeliveryNearby,
}

impl GeofenceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceEvent::PickupArrival => "pickup_arrival",
            GeofenceEvent::PickupNearby => "pickup_nearby",
            GeofenceEvent::DeliveryArrival => "delivery_arrival",
            GeofenceEvent::DeliveryNearby => "delivery_nearby",
        }
    }
}

/// TTL deduplication cache for geofence triggers. Each (order, event) pair
/// may fire at most once per window; entries expire individually rather than
/// being dropped in bulk on a size threshold. Single-instance state only; a
/// scaled-out deployment needs this behind a shared TTL store.
pub struct CooldownCache {
    entries: DashMap<(Uuid, GeofenceEvent), DateTime<Utc>>,
}

impl CooldownCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record a trigger attempt. Returns true when the event is allowed to
    /// fire; the check and the timestamp write are one atomic step under the
    /// entry lock.
    pub fn try_trigger(
        &self,
        order_id: Uuid,
        event: GeofenceEvent,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        match self.entries.entry((order_id, event)) {
            Entry::Occupied(mut occupied) => {
                if now - *occupied.get() < window {
                    false
                } else {
                    *occupied.get_mut() = now;
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
        }
    }

    pub fn purge_expired(&self, now: DateTime<Utc>, window: Duration) {
        self.entries.retain(|_, last| now - *last < window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CooldownCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingest one courier position report: persist the location, then evaluate
/// every active order of that courier against the pickup and delivery zones.
///
/// A failure on one order is logged and skipped; the remaining orders in the
/// same report are still evaluated. Returns the events that actually fired.
pub fn on_location_update(
    state: &EngineState,
    config: &Config,
    courier_id: Uuid,
    lat: f64,
    lng: f64,
    accuracy_m: Option<f64>,
) -> Result<Vec<(Uuid, GeofenceEvent)>, DispatchError> {
    let now = Utc::now();
    let position = GeoPoint { lat, lng };

    {
        let mut courier = state
            .couriers
            .get_mut(&courier_id)
            .ok_or_else(|| DispatchError::NotFound(format!("courier {courier_id} not found")))?;
        courier.location = Some(position);
        courier.location_accuracy_m = accuracy_m;
        courier.location_at = Some(now);
    }

    let active_orders: Vec<DeliveryOrder> = state
        .orders
        .iter()
        .filter(|entry| {
            let order = entry.value();
            order.assigned_courier == Some(courier_id) && order.status.is_active()
        })
        .map(|entry| entry.value().clone())
        .collect();

    let mut fired = Vec::new();
    for order in active_orders {
        match evaluate_order(state, config, &order, position, now) {
            Ok(events) => fired.extend(events.into_iter().map(|e| (order.id, e))),
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "geofence evaluation skipped order");
            }
        }
    }

    state
        .cooldowns
        .purge_expired(now, Duration::seconds(config.geofence_cooldown_secs));

    Ok(fired)
}

fn evaluate_order(
    state: &EngineState,
    config: &Config,
    order: &DeliveryOrder,
    position: GeoPoint,
    now: DateTime<Utc>,
) -> Result<Vec<GeofenceEvent>, DispatchError> {
    let window = Duration::seconds(config.geofence_cooldown_secs);
    let to_pickup = haversine_m(&position, &order.pickup);
    let to_dropoff = haversine_m(&position, &order.dropoff);
    let mut fired = Vec::new();

    if order.status.awaiting_pickup() {
        if to_pickup <= config.pickup_arrival_m {
            if state
                .cooldowns
                .try_trigger(order.id, GeofenceEvent::PickupArrival, now, window)
            {
                transition(state, order.id, OrderStatus::PickedUp, now)?;
                state.append_tracking(TrackingEvent::new(
                    order.id,
                    GeofenceEvent::PickupArrival.as_str(),
                    format!("courier within {:.0} m of pickup", to_pickup),
                ));
                publish_geofence(state, order, GeofenceEvent::PickupArrival, to_pickup, None);
                fired.push(GeofenceEvent::PickupArrival);

                info!(order_id = %order.id, distance_m = to_pickup, "pickup arrival");
            }
        } else if to_pickup <= config.nearby_m
            && state
                .cooldowns
                .try_trigger(order.id, GeofenceEvent::PickupNearby, now, window)
        {
            publish_geofence(state, order, GeofenceEvent::PickupNearby, to_pickup, None);
            fired.push(GeofenceEvent::PickupNearby);
        }
    }

    // Re-read: the pickup rule above may just have moved the order en route,
    // and the delivery zones are evaluated against the current status.
    let status = state
        .orders
        .get(&order.id)
        .map(|o| o.status)
        .unwrap_or(order.status);

    if status.en_route() {
        if to_dropoff <= config.delivery_arrival_m {
            if state
                .cooldowns
                .try_trigger(order.id, GeofenceEvent::DeliveryArrival, now, window)
            {
                transition(state, order.id, OrderStatus::ArrivedDelivery, now)?;
                state.append_tracking(TrackingEvent::new(
                    order.id,
                    GeofenceEvent::DeliveryArrival.as_str(),
                    format!("courier within {:.0} m of dropoff", to_dropoff),
                ));
                publish_geofence(state, order, GeofenceEvent::DeliveryArrival, to_dropoff, None);
                fired.push(GeofenceEvent::DeliveryArrival);

                info!(order_id = %order.id, distance_m = to_dropoff, "delivery arrival");
            }
        } else if to_dropoff <= config.nearby_m
            && state
                .cooldowns
                .try_trigger(order.id, GeofenceEvent::DeliveryNearby, now, window)
        {
            let eta_min = to_dropoff / 1000.0 * config.minutes_per_km;
            publish_geofence(
                state,
                order,
                GeofenceEvent::DeliveryNearby,
                to_dropoff,
                Some(eta_min),
            );
            fired.push(GeofenceEvent::DeliveryNearby);
        }
    }

    Ok(fired)
}

fn transition(
    state: &EngineState,
    order_id: Uuid,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> Result<(), DispatchError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| DispatchError::NotFound(format!("order {order_id} not found")))?;

    order.status = to;
    if to == OrderStatus::PickedUp {
        order.picked_up_at = Some(now);
    }
    Ok(())
}

fn publish_geofence(
    state: &EngineState,
    order: &DeliveryOrder,
    event: GeofenceEvent,
    distance_m: f64,
    eta_min: Option<f64>,
) {
    state
        .metrics
        .geofence_events_total
        .with_label_values(&[event.as_str()])
        .inc();

    state.events.publish(
        events::order_channel(order.id),
        event.as_str(),
        json!({
            "order_id": order.id,
            "distance_m": distance_m,
            "eta_min": eta_min,
        }),
    );
}
