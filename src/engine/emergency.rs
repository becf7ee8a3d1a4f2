use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::capacity;
use crate::error::DispatchError;
use crate::events::{self, ADMIN_DISPATCH_CHANNEL};
use crate::geo::haversine_m;
use crate::models::emergency::{BackupCandidate, EmergencyDispatch, EmergencyStatus};
use crate::models::order::DeliveryOrder;
use crate::models::tracking::TrackingEvent;
use crate::state::EngineState;

const MAX_BACKUP_CANDIDATES: usize = 5;

/// Open an emergency for an order whose courier cannot finish the job.
/// Returns the pending record together with a ranked backup list.
pub fn create_emergency(
    state: &EngineState,
    order_id: Uuid,
    reason: &str,
    priority: u8,
    handled_by: &str,
) -> Result<(EmergencyDispatch, Vec<BackupCandidate>), DispatchError> {
    let order = state
        .orders
        .get(&order_id)
        .ok_or_else(|| DispatchError::NotFound(format!("order {order_id} not found")))?
        .value()
        .clone();

    let emergency = EmergencyDispatch {
        id: Uuid::new_v4(),
        order_id,
        original_courier: order.assigned_courier,
        priority,
        reason: reason.to_string(),
        status: EmergencyStatus::Pending,
        new_courier: None,
        handled_by: handled_by.to_string(),
        created_at: Utc::now(),
        assigned_at: None,
        response_time_secs: None,
        resolution_notes: None,
    };

    state.emergencies.insert(emergency.id, emergency.clone());
    state
        .metrics
        .emergencies_total
        .with_label_values(&["pending"])
        .inc();

    let backups = find_backup_riders(state, &order, priority);

    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "emergency_created",
        json!({
            "emergency_id": emergency.id,
            "order_id": order_id,
            "original_courier": emergency.original_courier,
            "priority": priority,
            "reason": reason,
            "backup_count": backups.len(),
        }),
    );

    warn!(
        emergency_id = %emergency.id,
        order_id = %order_id,
        priority,
        backups = backups.len(),
        "emergency dispatch opened"
    );

    Ok((emergency, backups))
}

/// Rank takeover candidates: online couriers with headroom, best rating
/// first, lighter load breaking ties, capped at five.
pub fn find_backup_riders(
    state: &EngineState,
    order: &DeliveryOrder,
    priority: u8,
) -> Vec<BackupCandidate> {
    let mut candidates: Vec<BackupCandidate> = state
        .couriers
        .iter()
        .filter(|entry| {
            let courier = entry.value();
            if !courier.is_online || Some(courier.id) == order.assigned_courier {
                return false;
            }
            match state.capacities.get(&courier.id) {
                Some(cap) => cap.available_for_dispatch && cap.headroom() > 0,
                // No record yet means the courier has never been dispatched.
                None => true,
            }
        })
        .map(|entry| {
            let courier = entry.value();
            let load_ratio = state
                .capacities
                .get(&courier.id)
                .map(|cap| cap.load_ratio())
                .unwrap_or(0.0);

            BackupCandidate {
                courier_id: courier.id,
                rating: courier.rating,
                load_ratio,
                distance_to_pickup_m: courier
                    .location
                    .as_ref()
                    .map(|loc| haversine_m(loc, &order.pickup)),
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.rating
            .total_cmp(&a.rating)
            .then(a.load_ratio.total_cmp(&b.load_ratio))
    });
    candidates.truncate(MAX_BACKUP_CANDIDATES);

    info!(
        order_id = %order.id,
        priority,
        candidates = candidates.len(),
        "backup riders selected"
    );

    candidates
}

/// Hand the order to the chosen backup courier.
pub fn reassign_emergency(
    state: &EngineState,
    config: &Config,
    emergency_id: Uuid,
    new_courier_id: Uuid,
    admin_id: &str,
) -> Result<EmergencyDispatch, DispatchError> {
    let emergency = state
        .emergencies
        .get(&emergency_id)
        .ok_or_else(|| DispatchError::NotFound(format!("emergency {emergency_id} not found")))?
        .value()
        .clone();

    if emergency.status != EmergencyStatus::Pending {
        return Err(DispatchError::BadRequest(format!(
            "emergency {emergency_id} is not pending"
        )));
    }

    let courier = state
        .couriers
        .get(&new_courier_id)
        .ok_or_else(|| DispatchError::NotFound(format!("courier {new_courier_id} not found")))?
        .value()
        .clone();

    if !courier.is_online {
        return Err(DispatchError::CourierOffline(new_courier_id));
    }

    capacity::reserve(state, config, new_courier_id, 1)?;

    {
        let mut order = state.orders.get_mut(&emergency.order_id).ok_or_else(|| {
            DispatchError::NotFound(format!("order {} not found", emergency.order_id))
        })?;
        order.assigned_courier = Some(new_courier_id);
    }

    if let Some(original) = emergency.original_courier {
        capacity::release(state, original, 1);
    }

    let now = Utc::now();
    let snapshot = {
        let mut stored = state
            .emergencies
            .get_mut(&emergency_id)
            .ok_or_else(|| DispatchError::NotFound(format!("emergency {emergency_id} not found")))?;
        stored.status = EmergencyStatus::Assigned;
        stored.new_courier = Some(new_courier_id);
        stored.assigned_at = Some(now);
        stored.response_time_secs = Some((now - stored.created_at).num_seconds());
        stored.value().clone()
    };

    state.append_tracking(TrackingEvent::new(
        emergency.order_id,
        "emergency_reassigned",
        format!("order handed to backup courier {new_courier_id} by {admin_id}"),
    ));

    state
        .metrics
        .emergencies_total
        .with_label_values(&["assigned"])
        .inc();
    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "emergency_reassigned",
        json!({
            "emergency_id": emergency_id,
            "order_id": emergency.order_id,
            "new_courier": new_courier_id,
            "response_time_secs": snapshot.response_time_secs,
            "admin_id": admin_id,
        }),
    );
    state.events.publish(
        events::order_channel(emergency.order_id),
        "courier_changed",
        json!({ "new_courier": new_courier_id }),
    );

    info!(
        emergency_id = %emergency_id,
        new_courier = %new_courier_id,
        "emergency reassigned"
    );

    Ok(snapshot)
}

pub fn resolve_emergency(
    state: &EngineState,
    emergency_id: Uuid,
    notes: &str,
) -> Result<EmergencyDispatch, DispatchError> {
    let mut emergency = state
        .emergencies
        .get_mut(&emergency_id)
        .ok_or_else(|| DispatchError::NotFound(format!("emergency {emergency_id} not found")))?;

    if emergency.status == EmergencyStatus::Resolved {
        return Err(DispatchError::BadRequest(format!(
            "emergency {emergency_id} is already resolved"
        )));
    }

    emergency.status = EmergencyStatus::Resolved;
    emergency.resolution_notes = Some(notes.to_string());
    let snapshot = emergency.value().clone();
    drop(emergency);

    state
        .metrics
        .emergencies_total
        .with_label_values(&["resolved"])
        .inc();
    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "emergency_resolved",
        json!({ "emergency_id": emergency_id, "order_id": snapshot.order_id }),
    );

    info!(emergency_id = %emergency_id, "emergency resolved");
    Ok(snapshot)
}
