//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Initialize JSON tracing output filtered by `service.log_level`
///
/// An unparseable level falls back to `info`. Calling this when a global
/// subscriber is already installed leaves the existing one in place.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    match installed {
        Ok(()) => tracing::info!("Tracing initialized for service: {}", config.service.name),
        Err(e) => tracing::debug!("Tracing already initialized: {}", e),
    }

    Ok(())
}
