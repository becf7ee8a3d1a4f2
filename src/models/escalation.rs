use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SlaCheckpoint {
    VendorAcceptance,
    PreparationTime,
    PickupTime,
    DeliveryTime,
}

impl SlaCheckpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaCheckpoint::VendorAcceptance => "vendor_acceptance",
            SlaCheckpoint::PreparationTime => "preparation_time",
            SlaCheckpoint::PickupTime => "pickup_time",
            SlaCheckpoint::DeliveryTime => "delivery_time",
        }
    }
}

/// A single missed checkpoint found by an SLA sweep.
///
/// `delay_minutes` counts from the checkpoint's reference timestamp (order
/// creation, vendor acceptance + prep, ready, promised delivery) and drives
/// the escalation level. `overdue_minutes` counts only the portion past the
/// allowed grace window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlaBreach {
    pub checkpoint: SlaCheckpoint,
    pub delay_minutes: i64,
    pub overdue_minutes: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EscalationStatus {
    Open,
    Acknowledged,
    Resolved,
    /// Superseded by a higher-level ticket for the same order.
    EscalatedFurther,
}

impl EscalationStatus {
    /// Open and acknowledged tickets still count toward the order's
    /// current escalation level.
    pub fn is_live(&self) -> bool {
        matches!(self, EscalationStatus::Open | EscalationStatus::Acknowledged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    pub id: Uuid,
    pub order_id: Uuid,
    pub level: u8,
    pub reason: String,
    pub checkpoint: Option<SlaCheckpoint>,
    pub status: EscalationStatus,
    pub response_deadline: DateTime<Utc>,
    pub notified_users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution_action: Option<String>,
    pub resolution_notes: Option<String>,
}
