use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use dispatch_engine::config::Config;
use dispatch_engine::engine::{batch, emergency, escalation, geofence, overrides, sla};
use dispatch_engine::error::DispatchError;
use dispatch_engine::models::batch::StopKind;
use dispatch_engine::models::courier::{Courier, CourierCapacity, GeoPoint, VehicleType};
use dispatch_engine::models::escalation::EscalationStatus;
use dispatch_engine::models::order::{DeliveryOrder, OrderStatus};
use dispatch_engine::state::EngineState;

fn test_state() -> EngineState {
    EngineState::new(64)
}

fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint { lat, lng }
}

fn seed_courier(state: &EngineState, online: bool, location: GeoPoint, rating: f64) -> Uuid {
    let courier = Courier {
        id: Uuid::new_v4(),
        name: "test-courier".to_string(),
        is_online: online,
        location: Some(location),
        location_accuracy_m: Some(5.0),
        location_at: Some(Utc::now()),
        rating,
        vehicle: VehicleType::Motorbike,
    };
    let id = courier.id;
    state.upsert_courier(courier);
    id
}

fn seed_order(state: &EngineState, pickup: GeoPoint, dropoff: GeoPoint) -> Uuid {
    let order = DeliveryOrder {
        id: Uuid::new_v4(),
        status: OrderStatus::Pending,
        assigned_courier: None,
        pickup,
        dropoff,
        promised_at: None,
        priority: 0,
        prep_time_minutes: 15,
        created_at: Utc::now(),
        accepted_at: None,
        ready_at: None,
        picked_up_at: None,
        delivered_at: None,
    };
    let id = order.id;
    state.upsert_order(order);
    id
}

fn berlin_order(state: &EngineState) -> Uuid {
    seed_order(state, point(52.51, 13.39), point(52.54, 13.42))
}

// --- DispatchBatchManager ---

#[test]
fn batch_creation_assigns_routes_and_counts() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let orders = vec![berlin_order(&state), berlin_order(&state)];

    let created = batch::create_batch(&state, &config, &orders, courier, "admin-1").unwrap();

    assert_eq!(created.order_count, 2);
    assert_eq!(created.stops.len(), 4);
    assert!(created.total_distance_m > 0.0);

    for id in &orders {
        let order = state.orders.get(id).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.assigned_courier, Some(courier));
        assert!(!state.tracking_for(*id).is_empty());
    }

    let capacity = state.capacities.get(&courier).unwrap();
    assert_eq!(capacity.current_orders, 2);
    assert_eq!(capacity.active_batch_id, Some(created.id));
}

#[test]
fn batch_stops_keep_pickup_before_delivery() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let orders = vec![
        berlin_order(&state),
        seed_order(&state, point(52.50, 13.38), point(52.53, 13.41)),
        seed_order(&state, point(52.55, 13.44), point(52.56, 13.46)),
    ];

    // Bump the courier's limit so three orders fit.
    state
        .capacities
        .insert(courier, CourierCapacity::new(courier, 5));

    let created = batch::create_batch(&state, &config, &orders, courier, "admin-1").unwrap();
    assert_eq!(created.stops.len(), 6);

    for id in &orders {
        let pickup = created
            .stops
            .iter()
            .find(|s| s.order_id == *id && s.kind == StopKind::Pickup)
            .unwrap();
        let delivery = created
            .stops
            .iter()
            .find(|s| s.order_id == *id && s.kind == StopKind::Delivery)
            .unwrap();
        assert!(pickup.sequence < delivery.sequence);
    }
}

#[test]
fn batch_rejects_unknown_orders() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let ghost = Uuid::new_v4();

    let err = batch::create_batch(&state, &config, &[ghost], courier, "admin-1").unwrap_err();
    match err {
        DispatchError::OrdersNotFound(ids) => assert_eq!(ids, vec![ghost]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn batch_rejects_offline_courier() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, false, point(52.52, 13.405), 4.6);
    let order = berlin_order(&state);

    let err = batch::create_batch(&state, &config, &[order], courier, "admin-1").unwrap_err();
    assert!(matches!(err, DispatchError::CourierOffline(id) if id == courier));
}

// Scenario: courier holding 2 of 3 slots cannot take a batch of 3; nothing
// is assigned and the count stays at 2.
#[test]
fn batch_over_capacity_fails_without_side_effects() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);

    let mut capacity = CourierCapacity::new(courier, 3);
    capacity.current_orders = 2;
    state.capacities.insert(courier, capacity);

    let orders = vec![
        berlin_order(&state),
        berlin_order(&state),
        berlin_order(&state),
    ];

    let err = batch::create_batch(&state, &config, &orders, courier, "admin-1").unwrap_err();
    match err {
        DispatchError::InsufficientCapacity { current, adding, max } => {
            assert_eq!((current, adding, max), (2, 3, 3));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(state.capacities.get(&courier).unwrap().current_orders, 2);
    for id in &orders {
        let order = state.orders.get(id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.assigned_courier.is_none());
    }
}

#[test]
fn batch_rejects_already_assigned_orders() {
    let state = test_state();
    let config = Config::default();
    let first = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let second = seed_courier(&state, true, point(52.53, 13.41), 4.2);
    let order = berlin_order(&state);

    batch::create_batch(&state, &config, &[order], first, "admin-1").unwrap();

    let err = batch::create_batch(&state, &config, &[order], second, "admin-1").unwrap_err();
    match err {
        DispatchError::OrdersAlreadyAssigned(ids) => assert_eq!(ids, vec![order]),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(state.orders.get(&order).unwrap().assigned_courier, Some(first));
    assert!(state.capacities.get(&second).is_none());
}

#[test]
fn racing_batches_over_one_order_let_exactly_one_win() {
    let state = Arc::new(test_state());
    let config = Config::default();
    let shared = berlin_order(&state);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let state = Arc::clone(&state);
        let config = config.clone();
        let courier = seed_courier(&state, true, point(52.52, 13.405), 4.5);
        let own = berlin_order(&state);

        handles.push(std::thread::spawn(move || {
            (
                courier,
                own,
                batch::create_batch(&state, &config, &[shared, own], courier, "admin-1").is_ok(),
            )
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter(|(_, _, ok)| *ok).collect();
    assert_eq!(winners.len(), 1);

    let (winner, _, _) = *winners[0];
    assert_eq!(state.orders.get(&shared).unwrap().assigned_courier, Some(winner));

    for (courier, own, ok) in &results {
        if !ok {
            // Losers leave no residue: their second order is back in the
            // pool and their capacity count is zero.
            assert!(state.orders.get(own).unwrap().assigned_courier.is_none());
            let load = state
                .capacities
                .get(courier)
                .map(|c| c.current_orders)
                .unwrap_or(0);
            assert_eq!(load, 0);
        }
    }
}

#[test]
fn cancelling_a_batch_releases_orders_and_capacity() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let orders = vec![berlin_order(&state), berlin_order(&state)];

    let created = batch::create_batch(&state, &config, &orders, courier, "admin-1").unwrap();
    batch::cancel_batch(&state, created.id).unwrap();

    for id in &orders {
        let order = state.orders.get(id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.assigned_courier.is_none());
    }

    let capacity = state.capacities.get(&courier).unwrap();
    assert_eq!(capacity.current_orders, 0);
    assert!(capacity.active_batch_id.is_none());
}

// --- OverrideManager ---

// Scenario: override from A to B moves exactly one slot between the two
// couriers and records both ids plus the reason.
#[test]
fn manual_override_swaps_capacity_and_logs() {
    let state = test_state();
    let config = Config::default();
    let courier_a = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let courier_b = seed_courier(&state, true, point(52.53, 13.41), 4.1);
    let order = berlin_order(&state);

    batch::create_batch(&state, &config, &[order], courier_a, "admin-1").unwrap();
    assert_eq!(state.capacities.get(&courier_a).unwrap().current_orders, 1);

    let log = overrides::manual_override(
        &state,
        &config,
        order,
        courier_b,
        "supervisor-7",
        "courier A stuck in traffic",
    )
    .unwrap();

    assert_eq!(log.previous_courier, Some(courier_a));
    assert_eq!(log.new_courier, courier_b);
    assert_eq!(log.reason, "courier A stuck in traffic");
    assert!(log.distance_to_pickup_m.is_some());

    assert_eq!(state.capacities.get(&courier_a).unwrap().current_orders, 0);
    assert_eq!(state.capacities.get(&courier_b).unwrap().current_orders, 1);

    let stored = state.orders.get(&order).unwrap();
    assert_eq!(stored.assigned_courier, Some(courier_b));
    // Status is untouched by an override.
    assert_eq!(stored.status, OrderStatus::Confirmed);
}

#[test]
fn override_without_courier_location_still_succeeds() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let order = berlin_order(&state);

    if let Some(mut stored) = state.couriers.get_mut(&courier) {
        stored.location = None;
    }

    let log =
        overrides::manual_override(&state, &config, order, courier, "supervisor-7", "manual pick")
            .unwrap();
    assert!(log.distance_to_pickup_m.is_none());
}

#[test]
fn racing_override_and_batch_claim_never_leak_capacity() {
    for _ in 0..200 {
        let state = Arc::new(test_state());
        let config = Config::default();
        let batch_courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
        let override_courier = seed_courier(&state, true, point(52.53, 13.41), 4.4);
        let order = berlin_order(&state);

        let batcher = {
            let state = Arc::clone(&state);
            let config = config.clone();
            std::thread::spawn(move || {
                batch::create_batch(&state, &config, &[order], batch_courier, "admin-1").is_ok()
            })
        };
        let overrider = {
            let state = Arc::clone(&state);
            let config = config.clone();
            std::thread::spawn(move || {
                overrides::manual_override(
                    &state,
                    &config,
                    order,
                    override_courier,
                    "supervisor-7",
                    "redirect",
                )
                .is_ok()
            })
        };

        batcher.join().unwrap();
        overrider.join().unwrap();

        // Whoever holds the order holds exactly one slot; the other courier
        // holds none. A stale-read reassignment would leave the batch
        // courier counting a slot for an order it no longer has.
        let holder = state.orders.get(&order).unwrap().assigned_courier.unwrap();
        let load = |courier: Uuid| {
            state
                .capacities
                .get(&courier)
                .map(|c| c.current_orders)
                .unwrap_or(0)
        };

        if holder == batch_courier {
            assert_eq!(load(batch_courier), 1);
            assert_eq!(load(override_courier), 0);
        } else {
            assert_eq!(holder, override_courier);
            assert_eq!(load(override_courier), 1);
            assert_eq!(load(batch_courier), 0, "batch courier left holding a slot");
        }
    }
}

#[test]
fn override_to_offline_courier_fails() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, false, point(52.52, 13.405), 4.6);
    let order = berlin_order(&state);

    let err =
        overrides::manual_override(&state, &config, order, courier, "supervisor-7", "nope")
            .unwrap_err();
    assert!(matches!(err, DispatchError::CourierOffline(id) if id == courier));
}

// --- GeofenceMonitor ---

// Scenario: 40 m from the pickup while preparing -> picked up, one tracking
// event; a second report inside the cooldown adds nothing.
#[test]
fn pickup_arrival_transitions_once_per_cooldown() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.0, 13.0), 4.6);
    // Dropoff far enough that no delivery zone fires.
    let order = seed_order(&state, point(52.5200, 13.4050), point(52.60, 13.50));

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.assigned_courier = Some(courier);
        stored.status = OrderStatus::Preparing;
    }

    // ~40 m north of the pickup.
    let fired = geofence::on_location_update(&state, &config, courier, 52.52036, 13.4050, Some(5.0))
        .unwrap();
    assert_eq!(fired, vec![(order, geofence::GeofenceEvent::PickupArrival)]);

    {
        let stored = state.orders.get(&order).unwrap();
        assert_eq!(stored.status, OrderStatus::PickedUp);
        assert!(stored.picked_up_at.is_some());
    }
    assert_eq!(state.tracking_for(order).len(), 1);

    let fired =
        geofence::on_location_update(&state, &config, courier, 52.52035, 13.4050, Some(5.0))
            .unwrap();
    assert!(fired.is_empty());
    assert_eq!(state.tracking_for(order).len(), 1);
}

#[test]
fn nearby_pickup_notifies_without_status_change() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.0, 13.0), 4.6);
    let order = seed_order(&state, point(52.5200, 13.4050), point(52.60, 13.50));

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.assigned_courier = Some(courier);
        stored.status = OrderStatus::Ready;
    }

    // ~300 m away: inside nearby, outside arrival.
    let fired =
        geofence::on_location_update(&state, &config, courier, 52.5227, 13.4050, Some(5.0))
            .unwrap();
    assert_eq!(fired, vec![(order, geofence::GeofenceEvent::PickupNearby)]);
    assert_eq!(state.orders.get(&order).unwrap().status, OrderStatus::Ready);
    assert!(state.tracking_for(order).is_empty());
}

#[test]
fn delivery_arrival_moves_en_route_order() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.0, 13.0), 4.6);
    let order = seed_order(&state, point(52.40, 13.30), point(52.5400, 13.4200));

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.assigned_courier = Some(courier);
        stored.status = OrderStatus::InTransit;
    }

    // ~50 m from the dropoff.
    let fired =
        geofence::on_location_update(&state, &config, courier, 52.54045, 13.4200, Some(5.0))
            .unwrap();
    assert_eq!(fired, vec![(order, geofence::GeofenceEvent::DeliveryArrival)]);
    assert_eq!(
        state.orders.get(&order).unwrap().status,
        OrderStatus::ArrivedDelivery
    );
}

#[test]
fn location_update_always_persists_position() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.0, 13.0), 4.6);

    geofence::on_location_update(&state, &config, courier, 48.85, 2.35, Some(12.0)).unwrap();

    let stored = state.couriers.get(&courier).unwrap();
    let location = stored.location.unwrap();
    assert!((location.lat - 48.85).abs() < 1e-9);
    assert!((location.lng - 2.35).abs() < 1e-9);
    assert_eq!(stored.location_accuracy_m, Some(12.0));
}

// --- SlaMonitor + EscalationManager ---

// Scenario: ready 12 minutes ago with no pickup -> level-1 ticket with a
// 10 minute response deadline, reporting 2 minutes overdue.
#[test]
fn ready_order_overdue_pickup_opens_level_one() {
    let state = test_state();
    let config = Config::default();
    let order = berlin_order(&state);

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.status = OrderStatus::Ready;
        stored.ready_at = Some(Utc::now() - Duration::minutes(12));
    }

    let detected = sla::sweep(&state, &config, Utc::now());
    assert_eq!(detected, 1);

    let tickets: Vec<_> = state
        .escalations
        .iter()
        .map(|e| e.value().clone())
        .collect();
    assert_eq!(tickets.len(), 1);

    let ticket = &tickets[0];
    assert_eq!(ticket.order_id, order);
    assert_eq!(ticket.level, 1);
    assert_eq!(ticket.status, EscalationStatus::Open);
    assert!(ticket.reason.contains("pickup_time"));
    assert!(ticket.reason.contains("2 min overdue"));

    let deadline_min = (ticket.response_deadline - ticket.created_at).num_minutes();
    assert_eq!(deadline_min, 10);
}

#[test]
fn repeated_sweeps_do_not_duplicate_tickets() {
    let state = test_state();
    let config = Config::default();
    let order = berlin_order(&state);

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.status = OrderStatus::Ready;
        stored.ready_at = Some(Utc::now() - Duration::minutes(12));
    }

    sla::sweep(&state, &config, Utc::now());
    sla::sweep(&state, &config, Utc::now());
    sla::sweep(&state, &config, Utc::now());

    assert_eq!(state.escalations.len(), 1);
}

#[test]
fn worsening_delay_escalates_and_supersedes() {
    let state = test_state();
    let config = Config::default();
    let order = berlin_order(&state);

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.status = OrderStatus::Ready;
        stored.ready_at = Some(Utc::now() - Duration::minutes(12));
    }
    sla::sweep(&state, &config, Utc::now());

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.ready_at = Some(Utc::now() - Duration::minutes(25));
    }
    sla::sweep(&state, &config, Utc::now());

    let mut levels: Vec<(u8, EscalationStatus)> = state
        .escalations
        .iter()
        .map(|e| (e.level, e.status))
        .collect();
    levels.sort_by_key(|(level, _)| *level);

    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0], (1, EscalationStatus::EscalatedFurther));
    assert_eq!(levels[1], (2, EscalationStatus::Open));
}

#[test]
fn escalation_level_never_decreases_while_live() {
    let state = test_state();
    let order = berlin_order(&state);

    escalation::create_escalation(&state, order, 3, "courier unreachable").unwrap();

    // A milder breach arriving later must not open a lower ticket.
    let breach = dispatch_engine::models::escalation::SlaBreach {
        checkpoint: dispatch_engine::models::escalation::SlaCheckpoint::PickupTime,
        delay_minutes: 12,
        overdue_minutes: 2,
    };
    let outcome = escalation::process_breach(&state, order, breach).unwrap();
    assert!(outcome.is_none());

    let live: Vec<u8> = state
        .escalations
        .iter()
        .filter(|e| e.status.is_live())
        .map(|e| e.level)
        .collect();
    assert_eq!(live, vec![3]);
}

#[test]
fn resolving_allows_fresh_lower_level_tickets() {
    let state = test_state();
    let order = berlin_order(&state);

    let ticket = escalation::create_escalation(&state, order, 2, "prep running long")
        .unwrap()
        .unwrap();
    escalation::resolve_escalation(&state, ticket.id, "ops-3", "called_vendor", "vendor resumed")
        .unwrap();

    let reopened = escalation::create_escalation(&state, order, 1, "still slow")
        .unwrap()
        .unwrap();
    assert_eq!(reopened.level, 1);
}

#[test]
fn sub_threshold_breaches_are_ignored() {
    let state = test_state();
    let order = berlin_order(&state);

    let breach = dispatch_engine::models::escalation::SlaBreach {
        checkpoint: dispatch_engine::models::escalation::SlaCheckpoint::DeliveryTime,
        delay_minutes: 7,
        overdue_minutes: 7,
    };
    let outcome = escalation::process_breach(&state, order, breach).unwrap();
    assert!(outcome.is_none());
    assert!(state.escalations.is_empty());
}

#[tokio::test]
async fn sla_monitor_task_detects_breaches() {
    let state = Arc::new(test_state());
    let order = berlin_order(&state);

    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.status = OrderStatus::Ready;
        stored.ready_at = Some(Utc::now() - Duration::minutes(15));
    }

    let mut config = Config::default();
    config.sla_interval_secs = 60;

    let monitor = tokio::spawn(sla::run_sla_monitor(Arc::clone(&state), config));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    monitor.abort();

    assert_eq!(state.escalations.len(), 1);
}

// --- EmergencyDispatcher ---

// Scenario: priority-3 emergency; backups are online couriers with headroom,
// rating descending, at most five.
#[test]
fn backup_riders_are_online_ranked_and_capped() {
    let state = test_state();

    let original = seed_courier(&state, false, point(52.52, 13.405), 4.9);
    let order = berlin_order(&state);
    {
        let mut stored = state.orders.get_mut(&order).unwrap();
        stored.assigned_courier = Some(original);
        stored.status = OrderStatus::PickedUp;
    }

    let ratings = [3.9, 4.8, 4.2, 4.5, 5.0, 4.0, 3.5];
    for rating in ratings {
        seed_courier(&state, true, point(52.53, 13.41), rating);
    }
    // One more offline and one fully loaded; neither may appear.
    seed_courier(&state, false, point(52.53, 13.41), 4.99);
    let full = seed_courier(&state, true, point(52.53, 13.41), 4.95);
    let mut full_capacity = CourierCapacity::new(full, 2);
    full_capacity.current_orders = 2;
    state.capacities.insert(full, full_capacity);

    let (created, backups) =
        emergency::create_emergency(&state, order, "courier went dark", 3, "ops-1").unwrap();

    assert_eq!(created.original_courier, Some(original));
    assert_eq!(created.priority, 3);

    assert_eq!(backups.len(), 5);
    let listed: Vec<f64> = backups.iter().map(|b| b.rating).collect();
    assert_eq!(listed, vec![5.0, 4.8, 4.5, 4.2, 4.0]);
    assert!(backups.iter().all(|b| b.courier_id != full));
    assert!(backups.iter().all(|b| b.courier_id != original));
}

#[test]
fn emergency_reassignment_moves_capacity_and_measures_response() {
    let state = test_state();
    let config = Config::default();

    let original = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let backup = seed_courier(&state, true, point(52.53, 13.41), 4.8);
    let order = berlin_order(&state);

    batch::create_batch(&state, &config, &[order], original, "admin-1").unwrap();

    let (created, _) =
        emergency::create_emergency(&state, order, "vehicle breakdown", 2, "ops-1").unwrap();
    let assigned =
        emergency::reassign_emergency(&state, &config, created.id, backup, "ops-1").unwrap();

    assert_eq!(
        assigned.status,
        dispatch_engine::models::emergency::EmergencyStatus::Assigned
    );
    assert_eq!(assigned.new_courier, Some(backup));
    assert!(assigned.response_time_secs.is_some());

    assert_eq!(state.orders.get(&order).unwrap().assigned_courier, Some(backup));
    assert_eq!(state.capacities.get(&original).unwrap().current_orders, 0);
    assert_eq!(state.capacities.get(&backup).unwrap().current_orders, 1);

    let resolved = emergency::resolve_emergency(&state, created.id, "customer confirmed").unwrap();
    assert_eq!(
        resolved.status,
        dispatch_engine::models::emergency::EmergencyStatus::Resolved
    );
}

#[test]
fn emergency_for_unknown_order_fails() {
    let state = test_state();
    let err = emergency::create_emergency(&state, Uuid::new_v4(), "??", 1, "ops-1").unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
}

// --- Events ---

#[tokio::test]
async fn batch_creation_publishes_to_admin_feed() {
    let state = test_state();
    let config = Config::default();
    let mut rx = state.events.subscribe();

    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let order = berlin_order(&state);
    batch::create_batch(&state, &config, &[order], courier, "admin-1").unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.channel, dispatch_engine::events::ADMIN_DISPATCH_CHANNEL);
    assert_eq!(event.kind, "batch_created");
    assert_eq!(event.data["order_count"], 1);
}

#[test]
fn publishing_without_subscribers_is_harmless() {
    let state = test_state();
    let config = Config::default();
    let courier = seed_courier(&state, true, point(52.52, 13.405), 4.6);
    let order = berlin_order(&state);

    // No receiver anywhere; the operation must still succeed.
    batch::create_batch(&state, &config, &[order], courier, "admin-1").unwrap();
}
