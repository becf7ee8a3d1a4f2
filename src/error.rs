use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("orders not found: {}", format_ids(.0))]
    OrdersNotFound(Vec<Uuid>),

    #[error("orders already assigned: {}", format_ids(.0))]
    OrdersAlreadyAssigned(Vec<Uuid>),

    #[error("courier {0} is offline")]
    CourierOffline(Uuid),

    #[error("courier {0} is not available for dispatch")]
    CourierUnavailable(Uuid),

    #[error("insufficient capacity: current {current} + adding {adding} > max {max}")]
    InsufficientCapacity { current: u8, adding: u8, max: u8 },

    #[error("internal error: {0}")]
    Internal(String),
}

fn format_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
