//! Backend selection
//!
//! Maps the configured backend kind string to a [`NetworkManager`]. Unknown
//! kinds are rejected rather than falling back to a default.

use super::NetworkManager;
use crate::config::EngineConfig;
use crate::error::{AgentError, Result};
use crate::monitoring::Telemetry;
use crate::service::{create_service_manager, ServiceManager};
use crate::tinc::TincManager;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Supported VPN backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// tinc mesh VPN
    Tinc,
}

impl BackendKind {
    /// Kind string used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tinc => "tinc",
        }
    }
}

impl FromStr for BackendKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tinc" => Ok(Self::Tinc),
            other => Err(AgentError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the manager for the configured backend and service manager
pub fn create_manager(config: &EngineConfig, telemetry: Telemetry) -> Result<Box<dyn NetworkManager>> {
    let service = telemetry.in_scope(|| create_service_manager(&config.service));
    create_manager_with_service(config, service, telemetry)
}

/// Build the manager for the configured backend on top of `service`
pub fn create_manager_with_service(
    config: &EngineConfig,
    service: Arc<dyn ServiceManager>,
    telemetry: Telemetry,
) -> Result<Box<dyn NetworkManager>> {
    let kind: BackendKind = config.backend.parse()?;
    telemetry.in_scope(|| info!("Using {} backend rooted at {:?}", kind, config.config_root));

    match kind {
        BackendKind::Tinc => Ok(Box::new(TincManager::new(config, service, telemetry))),
    }
}
