//! Topology snapshot loading
//!
//! Controllers deliver snapshots as JSON; operators may also keep them as
//! TOML files. Both decode into [`NetworkConfig`] and are not validated here,
//! `set_config` does that before writing anything.

use crate::error::{AgentError, Result};
use crate::network::NetworkConfig;
use std::fs;
use std::path::Path;

/// Parse a topology snapshot from JSON
pub fn parse_topology_json(json: &str) -> Result<NetworkConfig> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a topology snapshot from TOML
pub fn parse_topology_toml(toml: &str) -> Result<NetworkConfig> {
    Ok(toml::from_str(toml)?)
}

/// Load a topology snapshot from a `.json` or `.toml` file
pub fn load_topology<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| AgentError::io(path, e))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_topology_json(&contents),
        Some("toml") => parse_topology_toml(&contents),
        _ => Err(AgentError::Config(format!(
            "Unsupported topology file {:?} (expected .json or .toml)",
            path
        ))),
    }
}
