use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use iris_service::{load_engine, InferenceService};
use service_config::{ConfigManager, ConfigOverrides, LogFormat, ServiceConfig};

/// HTTP inference service for the iris species classifier
#[derive(Debug, Parser)]
#[command(name = "iris-service", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "IRIS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Model artifact path
    #[arg(short, long)]
    model_path: Option<PathBuf>,

    /// Log output format (text or json)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Load and validate the model artifact, print its metadata and exit
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            model_path: self.model_path.clone(),
            log_format: self.log_format,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    if let Some(path) = manager.source_file() {
        eprintln!("Using configuration file {}", path.display());
    }
    let config = manager.into_config();

    logging::init(&config.log)?;

    let workers = config.workers.unwrap_or_else(num_cpus::get);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    info!("Starting iris-service {} with {} workers", env!("CARGO_PKG_VERSION"), workers);

    let result = runtime.block_on(async move {
        if cli.check {
            check(&config).await
        } else {
            InferenceService::new(config).await?.run().await
        }
    });

    if let Err(e) = &result {
        error!("{:#}", e);
    }

    result
}

/// Validates the artifact without serving
async fn check(config: &ServiceConfig) -> Result<()> {
    let engine = load_engine(config).await?;
    println!("{}", serde_json::to_string_pretty(engine.metadata())?);
    Ok(())
}
