use anyhow::{anyhow, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

/// Initialize logging with the default level
pub fn init_logging() -> Result<()> {
    init_logging_with_options(None, false)
}

/// Initialize logging; `RUST_LOG` takes precedence over `log_level`
pub fn init_logging_with_options(log_level: Option<&str>, debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let level = log_level.unwrap_or(default_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("Invalid log level: {}", e))?;

    let fmt_layer = fmt::layer()
        .with_target(debug)
        .with_file(debug)
        .with_line_number(debug)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    debug!("Logging initialized with level: {}", level);
    Ok(())
}

/// Log the effective configuration at startup, without the auth token
pub fn log_startup_info(config: &AppConfig) {
    info!("=== tubefeed {} ===", env!("CARGO_PKG_VERSION"));
    info!("API instance: {}", config.api.instance_url);
    if let Some(auth) = &config.api.auth_instance_url {
        info!("Account instance: {}", auth);
    }
    info!(
        "Logged in: {}",
        if config.api.auth_token.is_some() { "yes" } else { "no" }
    );
    info!("Bookmark database: {}", config.get_database_path().display());
    debug!("Playlist sort order: {}", config.sort_order());
    debug!("Segment categories: {:?}", config.player.segment_categories);
}
