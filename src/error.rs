//! Error types for nodearmor
//!
//! This module defines the error types used throughout the engine.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in the binary.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for network orchestration operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// A network record with this id is already present
    #[error("Network already exists: {0}")]
    AlreadyExists(String),

    /// No network record with this id
    #[error("Network not found: {0}")]
    NotFound(String),

    /// Topology or identifier rejected before anything was written
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File create/write/remove failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation failed on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Key pair could not be generated or persisted
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// An existing key file could not be removed before regeneration
    #[error("Failed to remove key file {}: {source}", path.display())]
    KeyRemoval {
        /// Key file that is still present
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Service manager command failed to launch or exited non-zero
    #[error("Service control failed: {command}: {detail}")]
    ServiceControl {
        /// Command line that was run
        command: String,
        /// Exit status and combined output
        detail: String,
    },

    /// Service manager command did not finish in time
    #[error("Service command timed out after {timeout:?}: {command}")]
    LifecycleTimeout {
        /// Command line that was run
        command: String,
        /// Timeout that expired
        timeout: Duration,
    },

    /// Backend kind string with no implementation
    #[error("Unknown VPN backend: {0}")]
    UnknownBackend(String),

    /// Engine settings could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AgentError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using AgentError
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}
