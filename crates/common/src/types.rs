//! Common types for the iris inference service
//!
//! This module defines the service lifecycle state shared by the startup
//! sequence and the health endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a replica
///
/// A replica is `Ready` only between a successful model load plus listener
/// bind and the start of shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Model not loaded yet, or the replica is draining
    #[default]
    NotReady,
    /// Model loaded and requests are being served
    Ready,
}

impl ServiceState {
    /// Returns true if the replica should receive traffic
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceState::Ready)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::NotReady => write!(f, "not_ready"),
            ServiceState::Ready => write!(f, "ready"),
        }
    }
}
