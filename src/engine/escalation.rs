use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::events::{self, ADMIN_DISPATCH_CHANNEL};
use crate::models::escalation::{Escalation, EscalationStatus, SlaBreach, SlaCheckpoint};
use crate::state::EngineState;

/// Severity warranted by a delay: <10 min none, 10-19 level 1,
/// 20-29 level 2, 30+ level 3.
pub fn level_for(delay_minutes: i64) -> Option<u8> {
    match delay_minutes {
        i64::MIN..=9 => None,
        10..=19 => Some(1),
        20..=29 => Some(2),
        _ => Some(3),
    }
}

/// Minutes allowed to respond at each level.
pub fn response_deadline_minutes(level: u8) -> i64 {
    match level {
        1 => 10,
        2 => 5,
        _ => 2,
    }
}

/// Handle one breach reported by the SLA monitor. Below-threshold delays are
/// ignored; a warranted level at or below the order's current live level is a
/// no-op, so repeated sweeps over the same breach are idempotent.
pub fn process_breach(
    state: &EngineState,
    order_id: Uuid,
    breach: SlaBreach,
) -> Result<Option<Escalation>, DispatchError> {
    let Some(level) = level_for(breach.delay_minutes) else {
        return Ok(None);
    };

    let reason = format!(
        "{} breach: {} min overdue",
        breach.checkpoint.as_str(),
        breach.overdue_minutes
    );
    escalate(state, order_id, level, &reason, Some(breach.checkpoint))
}

/// Manual escalation at an explicit level, same creation path as breaches.
pub fn create_escalation(
    state: &EngineState,
    order_id: Uuid,
    level: u8,
    reason: &str,
) -> Result<Option<Escalation>, DispatchError> {
    if !(1..=3).contains(&level) {
        return Err(DispatchError::BadRequest(format!(
            "escalation level must be 1-3, got {level}"
        )));
    }
    escalate(state, order_id, level, reason, None)
}

fn escalate(
    state: &EngineState,
    order_id: Uuid,
    level: u8,
    reason: &str,
    checkpoint: Option<SlaCheckpoint>,
) -> Result<Option<Escalation>, DispatchError> {
    if !state.orders.contains_key(&order_id) {
        return Err(DispatchError::NotFound(format!("order {order_id} not found")));
    }

    // The entry guard on the per-order index is the compare-and-set: no
    // other breach for this order can interleave between the level read
    // and the ticket insert.
    let mut ticket_ids = state.escalations_by_order.entry(order_id).or_default();

    let current_level = ticket_ids
        .iter()
        .filter_map(|id| state.escalations.get(id))
        .filter(|e| e.status.is_live())
        .map(|e| e.level)
        .max();

    if let Some(current) = current_level {
        if current >= level {
            return Ok(None);
        }
        for id in ticket_ids.iter() {
            if let Some(mut existing) = state.escalations.get_mut(id) {
                if existing.status.is_live() {
                    existing.status = EscalationStatus::EscalatedFurther;
                }
            }
        }
    }

    let now = Utc::now();
    let escalation = Escalation {
        id: Uuid::new_v4(),
        order_id,
        level,
        reason: reason.to_string(),
        checkpoint,
        status: EscalationStatus::Open,
        response_deadline: now + Duration::minutes(response_deadline_minutes(level)),
        notified_users: notification_fanout(level),
        created_at: now,
        resolved_at: None,
        resolved_by: None,
        resolution_action: None,
        resolution_notes: None,
    };

    state.escalations.insert(escalation.id, escalation.clone());
    ticket_ids.push(escalation.id);
    drop(ticket_ids);

    state
        .metrics
        .escalations_total
        .with_label_values(&[&level.to_string()])
        .inc();

    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "escalation_created",
        json!({
            "escalation_id": escalation.id,
            "order_id": order_id,
            "level": level,
            "reason": reason,
            "response_deadline": escalation.response_deadline,
        }),
    );
    state.events.publish(
        events::order_channel(order_id),
        "escalation_created",
        json!({ "level": level, "reason": reason }),
    );

    warn!(
        order_id = %order_id,
        level,
        reason,
        "escalation created"
    );

    Ok(Some(escalation))
}

// Best-effort fan-out list; delivery itself is the event subscribers' job
// and is never retried or acknowledged.
fn notification_fanout(level: u8) -> Vec<String> {
    let mut users = vec!["dispatch_admin".to_string()];
    if level >= 2 {
        users.push("ops_manager".to_string());
    }
    if level >= 3 {
        users.push("platform_director".to_string());
    }
    users
}

pub fn acknowledge_escalation(
    state: &EngineState,
    escalation_id: Uuid,
    acknowledged_by: &str,
) -> Result<Escalation, DispatchError> {
    let mut escalation = state.escalations.get_mut(&escalation_id).ok_or_else(|| {
        DispatchError::NotFound(format!("escalation {escalation_id} not found"))
    })?;

    if escalation.status != EscalationStatus::Open {
        return Err(DispatchError::BadRequest(format!(
            "escalation {escalation_id} is not open"
        )));
    }

    escalation.status = EscalationStatus::Acknowledged;
    let snapshot = escalation.value().clone();
    drop(escalation);

    info!(escalation_id = %escalation_id, acknowledged_by, "escalation acknowledged");
    Ok(snapshot)
}

pub fn resolve_escalation(
    state: &EngineState,
    escalation_id: Uuid,
    resolved_by: &str,
    action: &str,
    notes: &str,
) -> Result<Escalation, DispatchError> {
    let mut escalation = state.escalations.get_mut(&escalation_id).ok_or_else(|| {
        DispatchError::NotFound(format!("escalation {escalation_id} not found"))
    })?;

    if escalation.status == EscalationStatus::Resolved {
        return Err(DispatchError::BadRequest(format!(
            "escalation {escalation_id} is already resolved"
        )));
    }

    escalation.status = EscalationStatus::Resolved;
    escalation.resolved_at = Some(Utc::now());
    escalation.resolved_by = Some(resolved_by.to_string());
    escalation.resolution_action = Some(action.to_string());
    escalation.resolution_notes = Some(notes.to_string());
    let snapshot = escalation.value().clone();
    drop(escalation);

    state.events.publish(
        ADMIN_DISPATCH_CHANNEL,
        "escalation_resolved",
        json!({
            "escalation_id": escalation_id,
            "order_id": snapshot.order_id,
            "resolved_by": resolved_by,
            "action": action,
        }),
    );

    info!(escalation_id = %escalation_id, resolved_by, action, "escalation resolved");
    Ok(snapshot)
}
