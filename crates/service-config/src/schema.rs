//! Configuration schema
//!
//! Typed settings deserialized by the `ConfigManager`, with their defaults
//! and validation rules.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use common::error::{Error, Result};

/// Default listen address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port, matching the container's exposed port
pub const DEFAULT_PORT: u16 = 8000;

/// Default artifact location inside the image
pub const DEFAULT_MODEL_PATH: &str = "models/iris_classifier.json";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default request body limit in bytes
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line records
    #[default]
    Text,
    /// JSON lines, for cluster log collectors
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Settings for one service replica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listen address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Path of the serialized model artifact
    pub model_path: PathBuf,

    /// Expected SHA-256 of the artifact file, hex encoded
    pub model_sha256: Option<String>,

    /// Runtime worker threads (defaults to the number of CPUs)
    pub workers: Option<usize>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Logging settings
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            model_sha256: None,
            workers: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Checks the settings for values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }

        if self.model_path.as_os_str().is_empty() {
            return Err(Error::Config("model_path must not be empty".to_string()));
        }

        if let Some(digest) = &self.model_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::Config(format!(
                    "model_sha256 must be 64 hex characters (got {:?})",
                    digest
                )));
            }
        }

        if self.workers == Some(0) {
            return Err(Error::Config("workers must be non-zero".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be non-zero".to_string()));
        }

        if self.max_body_bytes == 0 {
            return Err(Error::Config("max_body_bytes must be non-zero".to_string()));
        }

        Ok(())
    }

    /// Resolves the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("Invalid listen address {}:{}: {}", self.host, self.port, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("No address found for {}:{}", self.host, self.port)))
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8000);
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validation_failures() {
        let config = ServiceConfig { port: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = ServiceConfig { workers: Some(0), ..Default::default() };
        assert!(config.validate().is_err());

        let config = ServiceConfig { request_timeout_secs: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            model_sha256: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServiceConfig {
            model_sha256: Some("a".repeat(64)),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
