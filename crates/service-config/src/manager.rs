//! Configuration manager
//!
//! Builds a `ServiceConfig` from layered sources using the `config` crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use tracing::debug;

use common::error::{Error, Result};

use crate::schema::{
    LogFormat, ServiceConfig, DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_MODEL_PATH,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Prefix of environment variables read by the manager (`IRIS_PORT`, `IRIS_LOG__FORMAT`, ...)
pub const ENV_PREFIX: &str = "IRIS";

/// Values supplied on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Listen address
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Artifact path
    pub model_path: Option<PathBuf>,
    /// Log output format
    pub log_format: Option<LogFormat>,
}

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Resolved settings
    config: ServiceConfig,

    /// Config file the settings were read from, if any
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Creates a configuration manager from defaults and the process environment
    pub fn new() -> Result<Self> {
        Self::load(None, &ConfigOverrides::default())
    }

    /// Loads configuration from an optional file, the process environment and overrides
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        Self::build(path, overrides, None)
    }

    /// Loads configuration reading environment variables from `env` instead of the process
    pub fn load_with_env(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
        env: HashMap<String, String>,
    ) -> Result<Self> {
        Self::build(path, overrides, Some(env))
    }

    fn build(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Self::defaults().map_err(config_error)?;

        if let Some(path) = path {
            debug!("Reading configuration file {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        builder = Self::apply_overrides(builder, overrides).map_err(config_error)?;

        let config: ServiceConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;

        config.validate()?;

        Ok(Self {
            config,
            source_file: path.map(Path::to_path_buf),
        })
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("model_path", DEFAULT_MODEL_PATH)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("max_body_bytes", DEFAULT_MAX_BODY_BYTES as i64)?
            .set_default("log.level", "info")?
            .set_default("log.format", LogFormat::Text.to_string())
    }

    fn apply_overrides(
        mut builder: ConfigBuilder<DefaultState>,
        overrides: &ConfigOverrides,
    ) -> std::result::Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        if let Some(host) = &overrides.host {
            builder = builder.set_override("host", host.as_str())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("port", i64::from(port))?;
        }
        if let Some(model_path) = &overrides.model_path {
            builder = builder.set_override("model_path", model_path.to_string_lossy().to_string())?;
        }
        if let Some(format) = overrides.log_format {
            builder = builder.set_override("log.format", format.to_string())?;
        }
        Ok(builder)
    }

    /// Gets the resolved settings
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Consumes the manager, returning the resolved settings
    pub fn into_config(self) -> ServiceConfig {
        self.config
    }

    /// Gets the config file the settings were read from
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

fn config_error(e: config::ConfigError) -> Error {
    Error::Config(e.to_string())
}
