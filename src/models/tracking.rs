use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit trail entry on an order's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub order_id: Uuid,
    pub kind: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn new(order_id: Uuid, kind: &str, note: impl Into<String>) -> Self {
        Self {
            order_id,
            kind: kind.to_string(),
            note: note.into(),
            created_at: Utc::now(),
        }
    }
}
