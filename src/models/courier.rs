use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VehicleType {
    Bicycle,
    Motorbike,
    Car,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub is_online: bool,
    pub location: Option<GeoPoint>,
    pub location_accuracy_m: Option<f64>,
    pub location_at: Option<DateTime<Utc>>,
    pub rating: f64,
    pub vehicle: VehicleType,
}

/// Concurrent-load bookkeeping for one courier. Created lazily on first
/// dispatch; all mutations go through `engine::capacity` so the
/// `0 <= current_orders <= max_concurrent` invariant holds at every commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierCapacity {
    pub courier_id: Uuid,
    pub current_orders: u8,
    pub max_concurrent: u8,
    pub available_for_dispatch: bool,
    pub last_dispatch_at: Option<DateTime<Utc>>,
    pub dispatches_today: u32,
    pub active_batch_id: Option<Uuid>,
}

impl CourierCapacity {
    pub fn new(courier_id: Uuid, max_concurrent: u8) -> Self {
        Self {
            courier_id,
            current_orders: 0,
            max_concurrent,
            available_for_dispatch: true,
            last_dispatch_at: None,
            dispatches_today: 0,
            active_batch_id: None,
        }
    }

    pub fn load_ratio(&self) -> f64 {
        if self.max_concurrent == 0 {
            return 1.0;
        }
        self.current_orders as f64 / self.max_concurrent as f64
    }

    pub fn headroom(&self) -> u8 {
        self.max_concurrent.saturating_sub(self.current_orders)
    }
}
