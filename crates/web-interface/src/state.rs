//! Shared handler state

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use common::types::ServiceState;
use inference_engine::InferenceEngine;

/// Readiness flag shared between the serve loop and the health endpoint
#[derive(Debug, Default)]
pub struct Readiness {
    state: RwLock<ServiceState>,
}

impl Readiness {
    /// Creates a flag in the `NotReady` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the current state
    pub fn get(&self) -> ServiceState {
        *self.state.read()
    }

    /// Returns true if the replica should receive traffic
    pub fn is_ready(&self) -> bool {
        self.get().is_ready()
    }

    /// Moves to `state`, logging the transition
    pub fn set(&self, state: ServiceState) {
        let mut current = self.state.write();
        if *current != state {
            info!("Service state {} -> {}", *current, state);
            *current = state;
        }
    }
}

/// State handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// Loaded-once inference engine
    pub engine: Arc<InferenceEngine>,

    /// Lifecycle state reported by `/health`
    pub readiness: Arc<Readiness>,
}

impl AppState {
    /// Creates handler state
    pub fn new(engine: Arc<InferenceEngine>, readiness: Arc<Readiness>) -> Self {
        Self { engine, readiness }
    }
}
