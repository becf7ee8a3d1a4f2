use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmergencyStatus {
    Pending,
    Assigned,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyDispatch {
    pub id: Uuid,
    pub order_id: Uuid,
    pub original_courier: Option<Uuid>,
    pub priority: u8,
    pub reason: String,
    pub status: EmergencyStatus,
    pub new_courier: Option<Uuid>,
    pub handled_by: String,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    /// Seconds between creation and reassignment.
    pub response_time_secs: Option<i64>,
    pub resolution_notes: Option<String>,
}

/// One entry of the ranked backup list for an emergency reassignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupCandidate {
    pub courier_id: Uuid,
    pub rating: f64,
    pub load_ratio: f64,
    pub distance_to_pickup_m: Option<f64>,
}
