//! Boot — logging init and config load.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::CollectorConfig;
use crate::error::ConfigError;

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout carries only the emitted messages.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multiline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate the collector configuration.
pub fn boot() -> Result<CollectorConfig, ConfigError> {
    info!("Starting multiline collector v{}", env!("CARGO_PKG_VERSION"));

    let config = CollectorConfig::load()?;
    info!(
        "Multiline grouping: timeout={}ms, size_limit={} bytes, channel_capacity={}",
        config.timeout_ms, config.size_limit, config.channel_capacity
    );
    Ok(config)
}
