use crate::config::EngineConfig;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber filtered by `config.log_filter`.
///
/// An unparsable filter falls back to `info`. Returns false when a global
/// subscriber was already installed, which is expected in tests.
pub fn init_tracing(config: &EngineConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
