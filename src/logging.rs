//! Tracing subscriber setup

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. `verbose` forces debug output
/// for this crate.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("info,pantryfinder=debug"),
        Err(_) => EnvFilter::new(&config.level),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.pretty().try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
