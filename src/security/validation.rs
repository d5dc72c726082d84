//! Input validation and sanitization
//!
//! Network ids become directory names, tinc netnames and systemd unit
//! names, so they are checked before any path is built from them.

use crate::error::AgentError;
use tracing::warn;

/// Maximum network id length
const MAX_NETWORK_ID_LEN: usize = 64;

/// Validate network id (alphanumeric, dashes, underscores)
pub fn validate_network_id(id: &str) -> Result<(), AgentError> {
    if id.is_empty() {
        return Err(AgentError::InvalidConfig(
            "Network id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_NETWORK_ID_LEN {
        return Err(AgentError::InvalidConfig(format!(
            "Network id too long (max {} characters)",
            MAX_NETWORK_ID_LEN
        )));
    }

    // Only allow alphanumeric, dash, underscore
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        warn!("Rejected network id {:?}", id);
        return Err(AgentError::InvalidConfig(format!(
            "Invalid network id '{}': only alphanumeric, dash, and underscore allowed",
            id
        )));
    }

    // Must not start with dash or underscore
    if id.starts_with('-') || id.starts_with('_') {
        return Err(AgentError::InvalidConfig(
            "Network id cannot start with dash or underscore".to_string(),
        ));
    }

    Ok(())
}

/// Whether a directory entry name could be a network id
pub fn is_valid_network_id(id: &str) -> bool {
    validate_network_id(id).is_ok()
}
