use tracing_subscriber::EnvFilter;

use crate::error::{BarError, Result};

/// Filter from `RUST_LOG` when set and valid, otherwise from `fallback`.
pub fn env_filter(fallback: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(fallback).map_err(|err| BarError::LogFilter {
        filter: fallback.to_owned(),
        message: err.to_string(),
    })
}

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// the bar. A second call keeps the first subscriber.
pub fn init_tracing(fallback: &str) -> Result<()> {
    let filter = env_filter(fallback)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
