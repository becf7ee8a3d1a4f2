use chrono::{Duration, Utc};

use crate::geo::haversine_m;
use crate::models::batch::{BatchStop, StopKind};
use crate::models::courier::GeoPoint;
use crate::models::order::DeliveryOrder;

#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub stops: Vec<BatchStop>,
    pub total_distance_m: f64,
    pub total_duration_min: f64,
}

/// Greedy nearest-neighbor route over a courier's order set.
///
/// Repeatedly picks the unvisited pickup closest to the current position,
/// then visits that order's delivery immediately after. Pairing the two
/// stops keeps the route O(n²) instead of solving a full TSP; for the
/// batch sizes a single courier carries the loss against optimal is small.
/// Durations come from a flat minutes-per-km estimate; a real routing
/// provider can replace them downstream.
pub fn optimize(orders: &[DeliveryOrder], start: GeoPoint, minutes_per_km: f64) -> RoutePlan {
    let mut remaining: Vec<&DeliveryOrder> = orders.iter().collect();
    let mut stops = Vec::with_capacity(orders.len() * 2);

    let departure = Utc::now();
    let mut position = start;
    let mut sequence: u32 = 1;
    let mut total_distance_m = 0.0;
    let mut total_duration_min = 0.0;

    while !remaining.is_empty() {
        let (nearest_idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(idx, order)| (idx, haversine_m(&position, &order.pickup)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0));

        let order = remaining.swap_remove(nearest_idx);

        for (kind, location) in [
            (StopKind::Pickup, order.pickup),
            (StopKind::Delivery, order.dropoff),
        ] {
            let leg_distance_m = haversine_m(&position, &location);
            let leg_duration_min = leg_distance_m / 1000.0 * minutes_per_km;

            total_distance_m += leg_distance_m;
            total_duration_min += leg_duration_min;

            stops.push(BatchStop {
                order_id: order.id,
                kind,
                sequence,
                location,
                eta: departure + Duration::seconds((total_duration_min * 60.0) as i64),
                leg_distance_m,
                leg_duration_min,
            });

            position = location;
            sequence += 1;
        }
    }

    RoutePlan {
        stops,
        total_distance_m,
        total_duration_min,
    }
}
