use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::DispatchError;
use crate::models::courier::CourierCapacity;
use crate::state::EngineState;

/// Atomically reserve room for `adding` more orders on a courier.
///
/// The headroom check and the increment happen under the capacity entry
/// lock, so two concurrent reservations for the same courier cannot both
/// slip past `max_concurrent`. The record is created lazily with the
/// configured default on first use.
pub fn reserve(
    state: &EngineState,
    config: &Config,
    courier_id: Uuid,
    adding: u8,
) -> Result<CourierCapacity, DispatchError> {
    let mut entry = state
        .capacities
        .entry(courier_id)
        .or_insert_with(|| CourierCapacity::new(courier_id, config.default_max_concurrent));

    if !entry.available_for_dispatch {
        return Err(DispatchError::CourierUnavailable(courier_id));
    }

    if entry.current_orders as u16 + adding as u16 > entry.max_concurrent as u16 {
        return Err(DispatchError::InsufficientCapacity {
            current: entry.current_orders,
            adding,
            max: entry.max_concurrent,
        });
    }

    entry.current_orders += adding;
    entry.last_dispatch_at = Some(Utc::now());
    entry.dispatches_today += 1;

    let snapshot = entry.value().clone();
    drop(entry);

    update_utilization(state, &snapshot);
    Ok(snapshot)
}

/// Return `releasing` slots to a courier. Decrements saturate at zero so a
/// double release can never commit a negative load.
pub fn release(state: &EngineState, courier_id: Uuid, releasing: u8) {
    if let Some(mut entry) = state.capacities.get_mut(&courier_id) {
        entry.current_orders = entry.current_orders.saturating_sub(releasing);
        let snapshot = entry.value().clone();
        drop(entry);
        update_utilization(state, &snapshot);
    }
}

pub fn set_availability(state: &EngineState, config: &Config, courier_id: Uuid, available: bool) {
    let mut entry = state
        .capacities
        .entry(courier_id)
        .or_insert_with(|| CourierCapacity::new(courier_id, config.default_max_concurrent));
    entry.available_for_dispatch = available;
}

fn update_utilization(state: &EngineState, capacity: &CourierCapacity) {
    state
        .metrics
        .courier_utilization
        .with_label_values(&[&capacity.courier_id.to_string()])
        .set(capacity.load_ratio());
}
