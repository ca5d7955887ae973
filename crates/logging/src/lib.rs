//! Logging for the iris inference service
//!
//! This crate installs the global `tracing` subscriber. The filter comes from
//! `RUST_LOG` when set, falling back to the configured level, and records are
//! written either as text or as JSON lines.

use tracing_subscriber::{fmt, EnvFilter};

use common::error::{Error, Result};
use service_config::{LogConfig, LogFormat};

/// Builds the event filter, preferring `RUST_LOG` over the configured level
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", config.level, e))),
    }
}

/// Installs the global subscriber
///
/// Fails if a subscriber is already installed or the level is not a valid
/// filter directive.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let installed = match config.format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Failed to install log subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = LogConfig {
            level: "info,web_interface=debug".to_string(),
            format: LogFormat::Text,
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = LogConfig {
            level: "web_interface=loud".to_string(),
            format: LogFormat::Json,
        };
        assert!(build_filter(&config).is_err());
    }
}
