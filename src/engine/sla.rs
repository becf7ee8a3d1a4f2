use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use crate::config::Config;
use crate::engine::escalation;
use crate::models::escalation::{SlaBreach, SlaCheckpoint};
use crate::models::order::{DeliveryOrder, OrderStatus};
use crate::state::EngineState;

/// Evaluate the four service-level checkpoints for one order.
///
/// `delay_minutes` is measured from the checkpoint's reference timestamp
/// (creation, acceptance + prep estimate, ready, promised delivery) and is
/// what the escalation level is derived from; `overdue_minutes` is only the
/// part past the grace window and is what gets reported in the ticket.
pub fn check_breaches(order: &DeliveryOrder, now: DateTime<Utc>, config: &Config) -> Vec<SlaBreach> {
    let mut breaches = Vec::new();

    if order.status == OrderStatus::Pending && order.accepted_at.is_none() {
        let age_min = (now - order.created_at).num_minutes();
        if age_min > config.vendor_acceptance_grace_min {
            breaches.push(SlaBreach {
                checkpoint: SlaCheckpoint::VendorAcceptance,
                delay_minutes: age_min,
                overdue_minutes: age_min - config.vendor_acceptance_grace_min,
            });
        }
    }

    if matches!(order.status, OrderStatus::Confirmed | OrderStatus::Preparing) {
        if let Some(accepted_at) = order.accepted_at {
            let prep_deadline = accepted_at + Duration::minutes(order.prep_time_minutes);
            if now > prep_deadline {
                let overdue = (now - prep_deadline).num_minutes();
                breaches.push(SlaBreach {
                    checkpoint: SlaCheckpoint::PreparationTime,
                    delay_minutes: overdue,
                    overdue_minutes: overdue,
                });
            }
        }
    }

    if order.status == OrderStatus::Ready && order.picked_up_at.is_none() {
        if let Some(ready_at) = order.ready_at {
            let waiting_min = (now - ready_at).num_minutes();
            if waiting_min > config.pickup_grace_min {
                breaches.push(SlaBreach {
                    checkpoint: SlaCheckpoint::PickupTime,
                    delay_minutes: waiting_min,
                    overdue_minutes: waiting_min - config.pickup_grace_min,
                });
            }
        }
    }

    if let Some(promised_at) = order.promised_at {
        if now > promised_at {
            let overdue = (now - promised_at).num_minutes();
            breaches.push(SlaBreach {
                checkpoint: SlaCheckpoint::DeliveryTime,
                delay_minutes: overdue,
                overdue_minutes: overdue,
            });
        }
    }

    breaches
}

/// One pass over all non-terminal orders. A failure on one order is logged
/// and the sweep moves on. Returns the number of breaches detected.
pub fn sweep(state: &EngineState, config: &Config, now: DateTime<Utc>) -> usize {
    let candidates: Vec<DeliveryOrder> = state
        .orders
        .iter()
        .filter(|entry| !entry.value().status.is_terminal())
        .map(|entry| entry.value().clone())
        .collect();

    let mut detected = 0;
    for order in candidates {
        for breach in check_breaches(&order, now, config) {
            detected += 1;
            state
                .metrics
                .sla_breaches_total
                .with_label_values(&[breach.checkpoint.as_str()])
                .inc();

            if let Err(err) = escalation::process_breach(state, order.id, breach) {
                error!(
                    order_id = %order.id,
                    checkpoint = breach.checkpoint.as_str(),
                    error = %err,
                    "breach processing failed; continuing sweep"
                );
            }
        }
    }

    detected
}

/// Background task driving periodic SLA sweeps, spawned by the host.
pub async fn run_sla_monitor(state: Arc<EngineState>, config: Config) {
    info!(interval_secs = config.sla_interval_secs, "sla monitor started");

    let mut ticker =
        tokio::time::interval(std::time::Duration::from_secs(config.sla_interval_secs));

    loop {
        ticker.tick().await;

        let start = Instant::now();
        let detected = sweep(&state, &config, Utc::now());
        state
            .metrics
            .sla_sweep_seconds
            .observe(start.elapsed().as_secs_f64());

        if detected > 0 {
            info!(breaches = detected, "sla sweep finished");
        }
    }
}
