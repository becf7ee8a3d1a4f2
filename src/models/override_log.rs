use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable audit record of a manual reassignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideLog {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_courier: Option<Uuid>,
    pub new_courier: Uuid,
    pub reason: String,
    pub overridden_by: String,
    /// Straight-line distance from the new courier to the pickup at the
    /// moment of the override; None when the courier had no known location.
    pub distance_to_pickup_m: Option<f64>,
    pub courier_load: u8,
    pub courier_rating: f64,
    pub created_at: DateTime<Utc>,
}
