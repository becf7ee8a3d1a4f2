use std::env;

use crate::error::DispatchError;

/// Runtime tuning for the engine. The geofence radii use the 50/100/500 m
/// configuration; every value can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub event_buffer_size: usize,
    /// Radius around the pickup point that counts as "arrived", meters.
    pub pickup_arrival_m: f64,
    /// Radius around the dropoff point that counts as "arrived", meters.
    pub delivery_arrival_m: f64,
    /// Radius for "courier is nearby" notifications, meters.
    pub nearby_m: f64,
    /// Minimum interval between repeated geofence events for the same
    /// (order, event) pair, seconds.
    pub geofence_cooldown_secs: i64,
    /// Interval between SLA sweeps, seconds.
    pub sla_interval_secs: u64,
    /// Straight-line travel estimate used when no routing provider is wired in.
    pub minutes_per_km: f64,
    /// Max concurrent orders for a courier seen for the first time.
    pub default_max_concurrent: u8,
    /// Minutes a vendor gets to accept an order before it counts as a breach.
    pub vendor_acceptance_grace_min: i64,
    /// Minutes an order may sit ready before the missing pickup counts as a breach.
    pub pickup_grace_min: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            pickup_arrival_m: parse_or_default("PICKUP_ARRIVAL_M", 50.0)?,
            delivery_arrival_m: parse_or_default("DELIVERY_ARRIVAL_M", 100.0)?,
            nearby_m: parse_or_default("NEARBY_M", 500.0)?,
            geofence_cooldown_secs: parse_or_default("GEOFENCE_COOLDOWN_SECS", 60)?,
            sla_interval_secs: parse_or_default("SLA_INTERVAL_SECS", 30)?,
            minutes_per_km: parse_or_default("MINUTES_PER_KM", 3.0)?,
            default_max_concurrent: parse_or_default("DEFAULT_MAX_CONCURRENT", 3)?,
            vendor_acceptance_grace_min: parse_or_default("VENDOR_ACCEPTANCE_GRACE_MIN", 5)?,
            pickup_grace_min: parse_or_default("PICKUP_GRACE_MIN", 10)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            pickup_arrival_m: 50.0,
            delivery_arrival_m: 100.0,
            nearby_m: 500.0,
            geofence_cooldown_secs: 60,
            sla_interval_secs: 30,
            minutes_per_km: 3.0,
            default_max_concurrent: 3,
            vendor_acceptance_grace_min: 5,
            pickup_grace_min: 10,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
