use chrono::Utc;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::{capacity, route};
use crate::error::DispatchError;
use crate::events::{self, ADMIN_DISPATCH_CHANNEL};
use crate::models::batch::{BatchStatus, DispatchBatch};
use crate::models::order::OrderStatus;
use crate::models::tracking::TrackingEvent;
use crate::state::EngineState;

/// Assign a set of unclaimed orders to one courier as a single routed batch.
///
/// Validation, capacity reservation and per-order claims are ordered so that
/// any failure unwinds completely: the reservation is taken first (atomic
/// under the capacity lock), then each order is claimed with a compare-and-set
/// on its `assigned_courier` field. A lost race on any order rolls back the
/// claims already taken and returns the reservation.
pub fn create_batch(
    state: &EngineState,
    config: &Config,
    order_ids: &[Uuid],
    courier_id: Uuid,
    assigned_by: &str,
) -> Result<DispatchBatch, DispatchError> {
    if order_ids.is_empty() {
        return Err(DispatchError::BadRequest(
            "batch must contain at least one order".to_string(),
        ));
    }
    if order_ids.len() > u8::MAX as usize {
        return Err(DispatchError::BadRequest(format!(
            "batch of {} orders exceeds any courier capacity",
            order_ids.len()
        )));
    }

    let mut missing = Vec::new();
    let mut already_assigned = Vec::new();
    let mut orders = Vec::with_capacity(order_ids.len());

    for id in order_ids {
        match state.orders.get(id) {
            None => missing.push(*id),
            Some(order) if order.assigned_courier.is_some() => already_assigned.push(*id),
            Some(order) => orders.push(order.value().clone()),
        }
    }

    if !missing.is_empty() {
        fail_metric(state);
        return Err(DispatchError::OrdersNotFound(missing));
    }
    if !already_assigned.is_empty() {
        fail_metric(state);
        return Err(DispatchError::OrdersAlreadyAssigned(already_assigned));
    }

    let courier = state
        .couriers
        .get(&courier_id)
        .ok_or_else(|| DispatchError::NotFound(format!("courier {courier_id} not found")))?
        .value()
        .clone();

    if !courier.is_online {
        fail_metric(state);
        return Err(DispatchError::CourierOffline(courier_id));
    }

    // From here on the reservation is held and must be returned on failure.
    let adding = order_ids.len() as u8;
    if let Err(err) = capacity::reserve(state, config, courier_id, adding) {
        fail_metric(state);
        return Err(err);
    }

    let start = courier.location.unwrap_or(orders[0].pickup);
    let plan = route::optimize(&orders, start, config.minutes_per_km);

    let mut claimed = Vec::with_capacity(orders.len());
    for order in &orders {
        match claim_order(state, order.id, courier_id) {
            Ok(()) => claimed.push(order.id),
            Err(err) => {
                rollback(state, &claimed, courier_id, adding);
                fail_metric(state);
                error!(order_id = %order.id, error = %err, "batch claim lost, rolled back");
                return Err(err);
            }
        }
    }

    let batch = DispatchBatch {
        id: Uuid::new_v4(),
        courier_id,
        order_count: orders.len(),
        status: BatchStatus::Active,
        stops: plan.stops,
        total_distance_m: plan.total_distance_m,
        total_duration_min: plan.total_duration_min,
        assigned_by: assigned_by.to_string(),
        created_at: Utc::now(),
    };

    if let Some(mut record) = state.capacities.get_mut(&courier_id) {
        record.active_batch_id = Some(batch.id);
    }

    state.batches.insert(batch.id, batch.clone());

    for order_id in &claimed {
        state.append_tracking(TrackingEvent::new(
            *order_id,
            "batch_assigned",
            format!("assigned to courier {courier_id} in batch {}", batch.id),
        ));
    }

    state.metrics.batches_total.with_label_values(&["success"]).inc();
    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "batch_created",
        json!({
            "batch_id": batch.id,
            "courier_id": courier_id,
            "order_count": batch.order_count,
            "total_distance_m": batch.total_distance_m,
            "total_duration_min": batch.total_duration_min,
            "assigned_by": assigned_by,
        }),
    );
    state.events.publish(
        events::courier_channel(courier_id),
        "batch_created",
        json!({ "batch_id": batch.id, "order_count": batch.order_count }),
    );

    info!(
        batch_id = %batch.id,
        courier_id = %courier_id,
        orders = batch.order_count,
        "dispatch batch created"
    );

    Ok(batch)
}

/// Compare-and-set the order's courier under the order entry lock. Exactly
/// one of two racing batch creations can claim a given order.
fn claim_order(state: &EngineState, order_id: Uuid, courier_id: Uuid) -> Result<(), DispatchError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or(DispatchError::OrdersNotFound(vec![order_id]))?;

    if order.assigned_courier.is_some() {
        return Err(DispatchError::OrdersAlreadyAssigned(vec![order_id]));
    }

    order.assigned_courier = Some(courier_id);
    order.status = OrderStatus::Confirmed;
    Ok(())
}

fn rollback(state: &EngineState, claimed: &[Uuid], courier_id: Uuid, reserved: u8) {
    for order_id in claimed {
        if let Some(mut order) = state.orders.get_mut(order_id) {
            order.assigned_courier = None;
            order.status = OrderStatus::Pending;
        }
    }
    capacity::release(state, courier_id, reserved);
}

fn fail_metric(state: &EngineState) {
    state.metrics.batches_total.with_label_values(&["error"]).inc();
}

/// Mark a batch done and hand the courier's slots back.
pub fn complete_batch(state: &EngineState, batch_id: Uuid) -> Result<DispatchBatch, DispatchError> {
    let mut batch = state
        .batches
        .get_mut(&batch_id)
        .ok_or_else(|| DispatchError::NotFound(format!("batch {batch_id} not found")))?;

    if batch.status != BatchStatus::Active {
        return Err(DispatchError::BadRequest(format!(
            "batch {batch_id} is not active"
        )));
    }

    batch.status = BatchStatus::Completed;
    let snapshot = batch.value().clone();
    drop(batch);

    finish_batch(state, &snapshot);
    Ok(snapshot)
}

/// Cancel a batch: undelivered orders go back to the unassigned pool.
pub fn cancel_batch(state: &EngineState, batch_id: Uuid) -> Result<DispatchBatch, DispatchError> {
    let mut batch = state
        .batches
        .get_mut(&batch_id)
        .ok_or_else(|| DispatchError::NotFound(format!("batch {batch_id} not found")))?;

    if batch.status != BatchStatus::Active {
        return Err(DispatchError::BadRequest(format!(
            "batch {batch_id} is not active"
        )));
    }

    batch.status = BatchStatus::Cancelled;
    let snapshot = batch.value().clone();
    drop(batch);

    let mut order_ids: Vec<Uuid> = snapshot.stops.iter().map(|s| s.order_id).collect();
    order_ids.sort_unstable();
    order_ids.dedup();

    for order_id in order_ids {
        if let Some(mut order) = state.orders.get_mut(&order_id) {
            if order.assigned_courier == Some(snapshot.courier_id) && !order.status.is_terminal() {
                order.assigned_courier = None;
                order.status = OrderStatus::Pending;
            }
        }
    }

    finish_batch(state, &snapshot);
    Ok(snapshot)
}

fn finish_batch(state: &EngineState, batch: &DispatchBatch) {
    capacity::release(state, batch.courier_id, batch.order_count as u8);
    if let Some(mut record) = state.capacities.get_mut(&batch.courier_id) {
        if record.active_batch_id == Some(batch.id) {
            record.active_batch_id = None;
        }
    }

    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "batch_closed",
        json!({ "batch_id": batch.id, "status": batch.status }),
    );
}
