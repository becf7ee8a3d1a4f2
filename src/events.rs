use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Feed every admin dispatch console subscribes to.
pub const ADMIN_DISPATCH_CHANNEL: &str = "dispatch:admin";

pub fn order_channel(order_id: Uuid) -> String {
    format!("order:{order_id}")
}

pub fn courier_channel(courier_id: Uuid) -> String {
    format!("courier:{courier_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub channel: String,
    pub kind: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Fire-and-forget publisher backed by a broadcast channel. Hosts bridge the
/// receiver onto whatever pub/sub transport they run; a publish with no
/// subscribers is not an error and never affects the triggering operation.
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventPublisher {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn publish(&self, channel: impl Into<String>, kind: &str, data: Value) {
        let event = DispatchEvent {
            channel: channel.into(),
            kind: kind.to_string(),
            data,
            timestamp: Utc::now(),
        };

        if self.tx.send(event).is_err() {
            tracing::debug!(kind, "event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }
}
