use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::capacity;
use crate::error::DispatchError;
use crate::events::{self, ADMIN_DISPATCH_CHANNEL};
use crate::geo::haversine_m;
use crate::models::override_log::OverrideLog;
use crate::models::tracking::TrackingEvent;
use crate::state::EngineState;

/// Manually reassign one order to a different courier, leaving its status
/// untouched and writing an immutable audit record.
///
/// The new courier's slot is reserved first; the reassignment itself is a
/// compare-and-set under the order entry lock against the courier read at
/// validation time, so a concurrent claim cannot interleave between the
/// read and the write. On a lost race the reservation is returned and the
/// call fails with a conflict; a capacity failure leaves everything as it
/// was.
pub fn manual_override(
    state: &EngineState,
    config: &Config,
    order_id: Uuid,
    new_courier_id: Uuid,
    overridden_by: &str,
    reason: &str,
) -> Result<OverrideLog, DispatchError> {
    let order = state
        .orders
        .get(&order_id)
        .ok_or_else(|| DispatchError::NotFound(format!("order {order_id} not found")))?
        .value()
        .clone();

    let courier = state
        .couriers
        .get(&new_courier_id)
        .ok_or_else(|| DispatchError::NotFound(format!("courier {new_courier_id} not found")))?
        .value()
        .clone();

    if !courier.is_online {
        return Err(DispatchError::CourierOffline(new_courier_id));
    }

    let previous_courier = order.assigned_courier;
    if previous_courier == Some(new_courier_id) {
        return Err(DispatchError::BadRequest(format!(
            "order {order_id} is already assigned to courier {new_courier_id}"
        )));
    }

    // Best-effort audit distance; a courier without a known position still
    // gets the order.
    let distance_to_pickup_m = courier
        .location
        .as_ref()
        .map(|loc| haversine_m(loc, &order.pickup));

    let reserved = capacity::reserve(state, config, new_courier_id, 1)?;

    {
        let mut stored = match state.orders.get_mut(&order_id) {
            Some(stored) => stored,
            None => {
                capacity::release(state, new_courier_id, 1);
                return Err(DispatchError::NotFound(format!("order {order_id} not found")));
            }
        };

        if stored.assigned_courier != previous_courier {
            drop(stored);
            capacity::release(state, new_courier_id, 1);
            return Err(DispatchError::Conflict(format!(
                "order {order_id} was reassigned concurrently"
            )));
        }

        stored.assigned_courier = Some(new_courier_id);
    }

    if let Some(previous) = previous_courier {
        capacity::release(state, previous, 1);
    }

    let log = OverrideLog {
        id: Uuid::new_v4(),
        order_id,
        previous_courier,
        new_courier: new_courier_id,
        reason: reason.to_string(),
        overridden_by: overridden_by.to_string(),
        distance_to_pickup_m,
        courier_load: reserved.current_orders,
        courier_rating: courier.rating,
        created_at: Utc::now(),
    };

    state.append_tracking(TrackingEvent::new(
        order_id,
        "manual_override",
        format!("reassigned from {previous_courier:?} to {new_courier_id}: {reason}"),
    ));
    state.override_logs.insert(log.id, log.clone());

    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "manual_override",
        json!({
            "order_id": order_id,
            "previous_courier": previous_courier,
            "new_courier": new_courier_id,
            "overridden_by": overridden_by,
            "reason": reason,
        }),
    );
    state.events.publish(
        events::order_channel(order_id),
        "courier_changed",
        json!({ "new_courier": new_courier_id }),
    );

    info!(
        order_id = %order_id,
        new_courier = %new_courier_id,
        previous = ?previous_courier,
        "manual override applied"
    );

    Ok(log)
}
