use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopKind {
    Pickup,
    Delivery,
}

/// One pickup or delivery visit in an optimized route. Pickup stops always
/// carry a lower sequence number than the same order's delivery stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStop {
    pub order_id: Uuid,
    pub kind: StopKind,
    pub sequence: u32,
    pub location: GeoPoint,
    pub eta: DateTime<Utc>,
    pub leg_distance_m: f64,
    pub leg_duration_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchBatch {
    pub id: Uuid,
    pub courier_id: Uuid,
    pub order_count: usize,
    pub status: BatchStatus,
    pub stops: Vec<BatchStop>,
    pub total_distance_m: f64,
    pub total_duration_min: f64,
    pub assigned_by: String,
    pub created_at: DateTime<Utc>,
}
