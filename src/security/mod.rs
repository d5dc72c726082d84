//! Security hardening for on-disk artifacts
//!
//! This module provides:
//! - Validation of network ids before they are used in paths and unit names
//! - File modes for keys, configuration and interface scripts

mod permissions;
mod validation;

pub use permissions::{create_dir, write_file, SecureFileMode};
pub use validation::{is_valid_network_id, validate_network_id};
