//! Main integration module for the iris inference service
//!
//! This module wires the service components together: the model artifact is
//! loaded once, wrapped in an inference engine and served over HTTP until a
//! shutdown signal arrives.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use inference_engine::InferenceEngine;
use model_manager::ModelLoader;
use service_config::ServiceConfig;
use web_interface::{Readiness, WebInterface};

/// One replica of the inference service
pub struct InferenceService {
    /// Resolved settings
    config: ServiceConfig,

    /// Loaded-once inference engine
    engine: Arc<InferenceEngine>,

    /// Lifecycle state reported by the health endpoint
    readiness: Arc<Readiness>,
}

impl InferenceService {
    /// Creates the service, loading the model artifact
    ///
    /// Fails if the artifact is missing, corrupt or incompatible; the service
    /// is never constructed, and so never reports ready, without a model.
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        info!("Initializing iris inference service");

        config.validate()?;
        let engine = load_engine(&config).await?;

        Ok(Self {
            config,
            engine: Arc::new(engine),
            readiness: Arc::new(Readiness::new()),
        })
    }

    /// Gets the readiness flag
    pub fn readiness(&self) -> Arc<Readiness> {
        self.readiness.clone()
    }

    /// Serves requests until SIGINT or SIGTERM
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves requests until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let interface = WebInterface::new(&self.config, self.engine.clone(), self.readiness.clone())?;

        interface.serve(shutdown).await?;

        info!("Iris inference service stopped");

        Ok(())
    }
}

/// Loads the configured artifact and builds the inference engine
pub async fn load_engine(config: &ServiceConfig) -> Result<InferenceEngine> {
    let model = ModelLoader::new(&config.model_path)
        .with_checksum(config.model_sha256.clone())
        .load()
        .await
        .with_context(|| format!("Failed to load model from {:?}", config.model_path))?;

    let engine = InferenceEngine::new(Arc::new(model)).context("Failed to build inference engine")?;

    Ok(engine)
}

/// Resolves on SIGINT, or on SIGTERM where supported
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
