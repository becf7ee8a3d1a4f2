use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    PickedUp,
    InTransit,
    ArrivedDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses the geofence monitor acts on.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::Preparing
                | OrderStatus::Ready
                | OrderStatus::PickedUp
                | OrderStatus::InTransit
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Courier has not collected the order yet.
    pub fn awaiting_pickup(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready
        )
    }

    /// Order is on the road.
    pub fn en_route(&self) -> bool {
        matches!(self, OrderStatus::PickedUp | OrderStatus::InTransit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub status: OrderStatus,
    pub assigned_courier: Option<Uuid>,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    /// Delivery-time commitment, when one was made.
    pub promised_at: Option<DateTime<Utc>>,
    pub priority: u8,
    /// Vendor's estimated preparation time.
    pub prep_time_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}
