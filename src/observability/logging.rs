//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. Output is human-readable text in Development and
//! JSON everywhere else unless the configuration picks a format explicitly.
//!
//! ## Key Features
//! - `RUST_LOG` overrides the configured level when set
//! - Noisy framework targets (`tower_http`) are held at `warn`
//! - Safe to call twice; the second call leaves the first subscriber in place

use crate::core::config::{HostEnvironment, LogFormat, LoggingSettings};
use crate::core::error::{CatalogError, CatalogResult};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is not set
pub fn default_directives(level: &str) -> String {
    format!("catalog_api={},tower_http=warn", level.to_ascii_lowercase())
}

/// Initialize the tracing subscriber
pub fn init_tracing(settings: &LoggingSettings, environment: HostEnvironment) -> CatalogResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&settings.level)))
        .map_err(|e| CatalogError::config(format!("Invalid log filter: {}", e)))?;

    let format = settings.effective_format(environment);
    let result = match format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    // Try to initialize, but don't fail if already initialized
    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return Ok(());
    }

    info!(
        environment = %environment,
        format = ?format,
        level = %settings.level,
        "Structured logging initialized"
    );
    Ok(())
}
