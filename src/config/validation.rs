//! Configuration validation functions
//!
//! Engine settings and topology snapshots are validated here before anything
//! touches the disk.

use super::{MAX_KEY_BITS, MIN_KEY_BITS};
use crate::error::{AgentError, Result};
use crate::network::NetworkConfig;
use std::collections::HashSet;
use std::net::IpAddr;

/// Maximum node id length
const MAX_NODE_ID_LEN: usize = 64;

/// Validate a node id (tinc node-name grammar, also file-name safe)
pub fn validate_node_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(AgentError::InvalidConfig(
            "Node id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_NODE_ID_LEN {
        return Err(AgentError::InvalidConfig(format!(
            "Node id '{}' exceeds maximum length of {} characters",
            id, MAX_NODE_ID_LEN
        )));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AgentError::InvalidConfig(format!(
            "Node id '{}' contains invalid characters (only ASCII alphanumeric and '_' allowed)",
            id
        )));
    }

    Ok(())
}

/// Validate a topology snapshot and return the index of the self node
pub fn validate_topology(config: &NetworkConfig) -> Result<usize> {
    let mut seen = HashSet::with_capacity(config.nodes.len());
    for node in &config.nodes {
        validate_node_id(&node.id)?;
        if !seen.insert(node.id.as_str()) {
            return Err(AgentError::InvalidConfig(format!(
                "Duplicate node id '{}'",
                node.id
            )));
        }
    }

    let matches: Vec<usize> = config
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.id == config.self_id)
        .map(|(i, _)| i)
        .collect();

    let self_index = match matches.as_slice() {
        [index] => *index,
        [] => {
            return Err(AgentError::InvalidConfig(format!(
                "Self id '{}' does not match any node",
                config.self_id
            )))
        }
        _ => {
            return Err(AgentError::InvalidConfig(format!(
                "Self id '{}' matches more than one node",
                config.self_id
            )))
        }
    };

    for peer in config.peers() {
        if peer.pub_key.trim().is_empty() {
            return Err(AgentError::InvalidConfig(format!(
                "Node '{}' has no public key",
                peer.id
            )));
        }
    }

    for route in &config.routes {
        if route.is_direct() {
            continue;
        }
        let same_family = matches!(
            (route.route.ip(), route.gateway),
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_))
        );
        if !same_family {
            return Err(AgentError::InvalidConfig(format!(
                "Gateway {} does not match address family of route {}",
                route.gateway, route.route
            )));
        }
    }

    Ok(self_index)
}

/// Validate RSA modulus size
pub(crate) fn validate_key_bits(bits: usize) -> Result<()> {
    if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&bits) {
        return Err(AgentError::Config(format!(
            "key_bits {} is out of valid range ({}-{})",
            bits, MIN_KEY_BITS, MAX_KEY_BITS
        )));
    }
    Ok(())
}

/// Validate the service unit name prefix
pub(crate) fn validate_unit_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(AgentError::Config(
            "unit_prefix cannot be empty".to_string(),
        ));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AgentError::Config(format!(
            "unit_prefix '{}' contains invalid characters (only alphanumeric, '_', and '-' allowed)",
            prefix
        )));
    }

    Ok(())
}
