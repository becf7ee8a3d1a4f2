pub mod metrics;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once from the embedding host.
pub fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_target(false)
        .compact()
        .init();
}
