//! File modes for generated artifacts
//!
//! Every artifact is written truncate-and-overwrite at its final path with
//! the mode its consumer expects.

use crate::error::{AgentError, Result};
use std::fs;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;
use tracing::debug;

/// File mode requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureFileMode {
    /// Private key file (0600)
    PrivateKey,
    /// Public key, main config, host descriptors (0644)
    Config,
    /// Interface scripts executed by the daemon (0755)
    Script,
    /// Network and hosts directories (0755)
    Directory,
}

impl SecureFileMode {
    /// Permission bits for this kind of file
    pub fn mode(&self) -> u32 {
        match self {
            Self::PrivateKey => 0o600,
            Self::Config => 0o644,
            Self::Script => 0o755,
            Self::Directory => 0o755,
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::PrivateKey => "0600 (owner read/write only)",
            Self::Config => "0644 (owner read/write, others read)",
            Self::Script => "0755 (owner full, others read/execute)",
            Self::Directory => "0755 (owner full, others read/execute)",
        }
    }
}

/// Write `contents` to `path`, truncating any existing file
///
/// The mode is applied on creation and re-applied to an existing file, since
/// `OpenOptions::mode` only affects newly created files.
pub fn write_file(path: &Path, contents: &[u8], mode: SecureFileMode) -> Result<()> {
    debug!("Writing {:?} with mode {}", path, mode.description());

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode.mode())
        .open(path)
        .map_err(|e| AgentError::io(path, e))?;

    file.set_permissions(fs::Permissions::from_mode(mode.mode()))
        .map_err(|e| AgentError::io(path, e))?;

    file.write_all(contents).map_err(|e| AgentError::io(path, e))?;
    file.flush().map_err(|e| AgentError::io(path, e))?;

    Ok(())
}

/// Create a directory (and parents) with directory mode
pub fn create_dir(path: &Path) -> Result<()> {
    fs::DirBuilder::new()
        .recursive(true)
        .mode(SecureFileMode::Directory.mode())
        .create(path)
        .map_err(|e| AgentError::io(path, e))
}
