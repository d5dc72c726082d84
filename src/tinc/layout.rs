//! On-disk layout of a tinc network
//!
//! ```text
//! <config_root>/<network id>/
//!     tinc.conf        main configuration (Name, ConnectTo)
//!     tinc-up          interface up script
//!     tinc-down        interface down script
//!     rsa_key.priv     node private key
//!     rsa_key.pub      node public key
//!     hosts/<node id>  one host descriptor per node
//! ```

use std::path::{Path, PathBuf};

const MAIN_CONFIG_FILE: &str = "tinc.conf";
const UP_SCRIPT_FILE: &str = "tinc-up";
const DOWN_SCRIPT_FILE: &str = "tinc-down";
const HOSTS_DIR: &str = "hosts";
const PRIVATE_KEY_FILE: &str = "rsa_key.priv";
const PUBLIC_KEY_FILE: &str = "rsa_key.pub";

/// Paths of every artifact belonging to one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPaths {
    dir: PathBuf,
}

impl NetworkPaths {
    /// Layout for network `id` under `root`
    pub fn new(root: &Path, id: &str) -> Self {
        Self { dir: root.join(id) }
    }

    /// Network directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// tinc.conf
    pub fn main_config(&self) -> PathBuf {
        self.dir.join(MAIN_CONFIG_FILE)
    }

    /// tinc-up
    pub fn up_script(&self) -> PathBuf {
        self.dir.join(UP_SCRIPT_FILE)
    }

    /// tinc-down
    pub fn down_script(&self) -> PathBuf {
        self.dir.join(DOWN_SCRIPT_FILE)
    }

    /// Host descriptor directory
    pub fn hosts_dir(&self) -> PathBuf {
        self.dir.join(HOSTS_DIR)
    }

    /// Host descriptor of one node
    pub fn host_file(&self, node_id: &str) -> PathBuf {
        self.hosts_dir().join(node_id)
    }

    /// Private key file
    pub fn private_key(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Public key file
    pub fn public_key(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }
}
