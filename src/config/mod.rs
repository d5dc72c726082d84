//! Configuration management
//!
//! This module handles the engine settings (a TOML file passed in by the
//! binary or embedder) and loading of topology snapshots from JSON or TOML.

mod topology;
mod validation;

pub use topology::{load_topology, parse_topology_json, parse_topology_toml};
pub use validation::{validate_node_id, validate_topology};

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest RSA modulus accepted for node keys
pub const MIN_KEY_BITS: usize = 1024;

/// Largest RSA modulus accepted for node keys
pub const MAX_KEY_BITS: usize = 8192;

/// Engine settings, constructed once at startup and handed to the manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// VPN backend kind (e.g., "tinc")
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory holding one subdirectory per network
    #[serde(default = "default_config_root")]
    pub config_root: PathBuf,

    /// tinc backend settings
    #[serde(default)]
    pub tinc: TincSettings,

    /// Service manager settings
    #[serde(default)]
    pub service: ServiceSettings,
}

/// Settings for the tinc backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TincSettings {
    /// Path to the tincd binary started by the service unit
    #[serde(default = "default_daemon_path")]
    pub daemon_path: PathBuf,

    /// RSA modulus size for generated node keys
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
}

/// Which service manager supervises the backend daemons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceManagerKind {
    /// systemd via systemctl
    Systemd,
    /// In-process bookkeeping only (containers, tests)
    Ephemeral,
}

/// Settings for the service manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service manager implementation
    #[serde(default = "default_manager")]
    pub manager: ServiceManagerKind,

    /// Directory unit files are written to
    #[serde(default = "default_unit_dir")]
    pub unit_dir: PathBuf,

    /// Prefix prepended to the network id to form the unit name
    #[serde(default = "default_unit_prefix")]
    pub unit_prefix: String,

    /// systemctl binary
    #[serde(default = "default_systemctl_path")]
    pub systemctl_path: PathBuf,

    /// Upper bound for a single service manager command
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl EngineConfig {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config = Self::parse(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| AgentError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Default settings rooted at a different configuration directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            config_root: root.into(),
            ..Self::default()
        }
    }

    /// Validate all settings
    pub fn validate(&self) -> Result<()> {
        if self.backend.trim().is_empty() {
            return Err(AgentError::Config("backend cannot be empty".to_string()));
        }

        validation::validate_key_bits(self.tinc.key_bits)?;
        validation::validate_unit_prefix(&self.service.unit_prefix)?;

        if self.service.command_timeout_secs == 0 {
            return Err(AgentError::Config(
                "command_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServiceSettings {
    /// Command timeout as a Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            config_root: default_config_root(),
            tinc: TincSettings::default(),
            service: ServiceSettings::default(),
        }
    }
}

impl Default for TincSettings {
    fn default() -> Self {
        Self {
            daemon_path: default_daemon_path(),
            key_bits: default_key_bits(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            manager: default_manager(),
            unit_dir: default_unit_dir(),
            unit_prefix: default_unit_prefix(),
            systemctl_path: default_systemctl_path(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

// Default value functions for serde
fn default_backend() -> String {
    "tinc".to_string()
}

fn default_config_root() -> PathBuf {
    PathBuf::from("/etc/tinc")
}

fn default_daemon_path() -> PathBuf {
    PathBuf::from("/usr/sbin/tincd")
}

fn default_key_bits() -> usize {
    2048
}

fn default_manager() -> ServiceManagerKind {
    ServiceManagerKind::Systemd
}

fn default_unit_dir() -> PathBuf {
    PathBuf::from("/etc/systemd/system")
}

fn default_unit_prefix() -> String {
    "tincd_".to_string()
}

fn default_systemctl_path() -> PathBuf {
    PathBuf::from("systemctl")
}

fn default_command_timeout_secs() -> u64 {
    30
}
