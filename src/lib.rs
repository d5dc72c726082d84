//! nodearmor: mesh VPN network orchestration engine
//!
//! This library turns abstract network topologies into the on-disk
//! configuration of a mesh VPN daemon (tinc) and supervises one daemon per
//! network through the host's service manager.
//!
//! # Architecture
//!
//! A [`network::NetworkManager`] selected by backend kind creates, finds and
//! deletes networks. Each [`network::Network`] handle applies full-replace
//! topology snapshots, manages the node's key pair and drives the daemon's
//! service unit. The engine is synchronous; callers serialize mutating
//! operations per network id.
//!
//! # Modules
//!
//! - `config`: Engine settings and topology loading
//! - `network`: Backend-agnostic network abstraction and backend selection
//! - `tinc`: tinc backend (translation, keys, on-disk layout)
//! - `service`: Service manager integration (systemd, in-process)
//! - `security`: Identifier validation and artifact file modes
//! - `monitoring`: Injected logging sink
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod monitoring;
pub mod network;
pub mod security;
pub mod service;
pub mod tinc;

// Re-export commonly used types
pub use error::{AgentError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
