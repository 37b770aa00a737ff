//! Tracing subscriber setup for binaries and tests that embed the data layer.
//!
//! `RUST_LOG` wins when set; otherwise the configured [`LogLevel`] becomes the
//! default filter. sqlx statement logging flows through the same subscriber
//! because sqlx emits `log` records that `tracing-subscriber` picks up.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogLevel;

/// Output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(level: LogLevel, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_directive()));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    tracing::debug!(level = level.as_filter_directive(), "Tracing initialized");
    Ok(())
}
