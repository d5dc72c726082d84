//! tinc mesh VPN backend
//!
//! Networks live in `<config_root>/<id>/` (see [`layout`]) and each one is
//! supervised as a service unit named `<unit_prefix><id>` running
//! `tincd -D -n <id> -c <dir>`.

mod keys;
mod layout;
mod translate;

pub use keys::{KeyPair, KeyStore};
pub use layout::NetworkPaths;
pub use translate::{render, Artifacts, HostDescriptor};

use crate::config::EngineConfig;
use crate::error::{AgentError, Result};
use crate::monitoring::Telemetry;
use crate::network::{BackendKind, Network, NetworkConfig, NetworkManager, NetworkState};
use crate::security::{
    create_dir, is_valid_network_id, validate_network_id, write_file, SecureFileMode,
};
use crate::service::{ServiceManager, ServiceUnit};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Backend name carried on every span
const BACKEND: &str = "tinc";

/// Settings and collaborators shared by the manager and its handles
struct TincContext {
    root: PathBuf,
    daemon_path: PathBuf,
    key_bits: usize,
    unit_prefix: String,
    service: Arc<dyn ServiceManager>,
    telemetry: Telemetry,
}

impl TincContext {
    fn paths(&self, id: &str) -> NetworkPaths {
        NetworkPaths::new(&self.root, id)
    }

    fn unit_name(&self, id: &str) -> String {
        format!("{}{}", self.unit_prefix, id)
    }

    /// Run `f` on the injected sink inside a span for network `id`
    fn scoped<T>(&self, id: &str, f: impl FnOnce() -> T) -> T {
        self.telemetry.in_scope(|| {
            let span = info_span!("network", backend = BACKEND, network = %id);
            let _enter = span.enter();
            f()
        })
    }
}

/// Network manager for the tinc backend
pub struct TincManager {
    ctx: Arc<TincContext>,
}

impl TincManager {
    /// Create a manager from engine settings and a service manager
    pub fn new(config: &EngineConfig, service: Arc<dyn ServiceManager>, telemetry: Telemetry) -> Self {
        Self {
            ctx: Arc::new(TincContext {
                root: config.config_root.clone(),
                daemon_path: config.tinc.daemon_path.clone(),
                key_bits: config.tinc.key_bits,
                unit_prefix: config.service.unit_prefix.clone(),
                service,
                telemetry,
            }),
        }
    }

    fn handle(&self, id: &str) -> TincNetwork {
        let paths = self.ctx.paths(id);
        TincNetwork {
            id: id.to_string(),
            unit: self.ctx.unit_name(id),
            keys: KeyStore::new(&paths, self.ctx.key_bits),
            paths,
            ctx: Arc::clone(&self.ctx),
        }
    }

    fn open(&self, id: &str) -> Result<TincNetwork> {
        validate_network_id(id)?;
        let network = self.handle(id);
        if !network.paths.dir().is_dir() {
            return Err(AgentError::NotFound(id.to_string()));
        }
        Ok(network)
    }
}

impl NetworkManager for TincManager {
    fn kind(&self) -> BackendKind {
        BackendKind::Tinc
    }

    fn create_network(&self, id: &str) -> Result<Box<dyn Network>> {
        self.ctx.scoped(id, || {
            validate_network_id(id)?;
            create_dir(&self.ctx.root)?;

            let network = self.handle(id);
            let dir = network.paths.dir();
            // The bare directory is the whole scaffold; set_config creates the rest.
            // Non-recursive so an existing record is detected atomically.
            fs::DirBuilder::new()
                .mode(SecureFileMode::Directory.mode())
                .create(dir)
                .map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => AgentError::AlreadyExists(id.to_string()),
                    _ => AgentError::io(dir, e),
                })?;

            info!("Created tinc network {} in {:?}", id, dir);
            Ok(Box::new(network) as Box<dyn Network>)
        })
    }

    fn get_network(&self, id: &str) -> Result<Box<dyn Network>> {
        self.ctx.scoped(id, || {
            let network = self.open(id)?;
            debug!("Opened tinc network {}", id);
            Ok(Box::new(network) as Box<dyn Network>)
        })
    }

    fn delete_network(&self, id: &str) -> Result<()> {
        self.ctx.scoped(id, || {
            let network = self.open(id)?;
            info!("Deleting tinc network {}", id);

            network.stop_unit()?;
            self.ctx.service.uninstall(&network.unit)?;

            let dir = network.paths.dir();
            fs::remove_dir_all(dir).map_err(|e| AgentError::io(dir, e))?;

            info!("Deleted tinc network {}", id);
            Ok(())
        })
    }

    fn list_networks(&self) -> Result<Vec<String>> {
        self.ctx.telemetry.in_scope(|| {
            let span = info_span!("networks", backend = BACKEND);
            let _enter = span.enter();

            let entries = match fs::read_dir(&self.ctx.root) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(AgentError::io(&self.ctx.root, e)),
            };

            let mut ids = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| AgentError::io(&self.ctx.root, e))?;
                if !entry.path().is_dir() {
                    continue;
                }
                match entry.file_name().into_string() {
                    Ok(name) if is_valid_network_id(&name) => ids.push(name),
                    _ => debug!("Skipping {:?} in config root", entry.path()),
                }
            }

            ids.sort();
            Ok(ids)
        })
    }
}

/// Handle bound to one tinc network record
pub struct TincNetwork {
    id: String,
    unit: String,
    paths: NetworkPaths,
    keys: KeyStore,
    ctx: Arc<TincContext>,
}

impl TincNetwork {
    /// Service unit supervising this network's daemon
    pub fn unit(&self) -> ServiceUnit {
        ServiceUnit {
            name: self.unit.clone(),
            description: format!("Tinc Daemon {}", self.id),
            program: self.ctx.daemon_path.clone(),
            args: vec![
                "-D".to_string(),
                "-n".to_string(),
                self.id.clone(),
                "-c".to_string(),
                self.paths.dir().display().to_string(),
            ],
        }
    }

    /// On-disk layout of this network
    pub fn paths(&self) -> &NetworkPaths {
        &self.paths
    }

    fn ensure_exists(&self) -> Result<()> {
        if self.paths.dir().is_dir() {
            Ok(())
        } else {
            Err(AgentError::NotFound(self.id.clone()))
        }
    }

    fn stop_unit(&self) -> Result<()> {
        self.ctx.service.stop(&self.unit)?;
        self.ctx.service.disable(&self.unit)
    }

    fn write_artifacts(&self, artifacts: &Artifacts) -> Result<()> {
        let hosts_dir = self.paths.hosts_dir();
        match fs::remove_dir_all(&hosts_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(AgentError::io(&hosts_dir, e)),
        }
        create_dir(&hosts_dir)?;

        for host in &artifacts.hosts {
            write_file(
                &self.paths.host_file(&host.node_id),
                host.contents.as_bytes(),
                SecureFileMode::Config,
            )?;
        }

        write_file(
            &self.paths.main_config(),
            artifacts.main_config.as_bytes(),
            SecureFileMode::Config,
        )?;
        write_file(
            &self.paths.up_script(),
            artifacts.up_script.as_bytes(),
            SecureFileMode::Script,
        )?;
        write_file(
            &self.paths.down_script(),
            artifacts.down_script.as_bytes(),
            SecureFileMode::Script,
        )
    }
}

impl Network for TincNetwork {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&self) -> Result<()> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            if !self.paths.main_config().exists() {
                warn!("Starting network {} before it has been configured", self.id);
            }

            info!("Starting tinc network {}", self.id);
            self.ctx.service.install(&self.unit())?;
            self.ctx.service.start(&self.unit)?;
            self.ctx.service.enable(&self.unit)
        })
    }

    fn stop(&self) -> Result<()> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            info!("Stopping tinc network {}", self.id);
            self.stop_unit()
        })
    }

    fn reload(&self) -> Result<()> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            info!("Reloading tinc network {}", self.id);
            self.ctx.service.reload(&self.unit)
        })
    }

    fn set_config(&self, config: &NetworkConfig) -> Result<()> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            let self_index = config.validate()?;
            let self_node = &config.nodes[self_index];

            let pub_key = self.keys.public_key()?;
            if !self_node.pub_key.is_empty() && self_node.pub_key.trim() != pub_key.trim() {
                warn!(
                    "Supplied key for self node {} differs from the local key; using the local key",
                    self_node.id
                );
            }

            let artifacts = render(config, self_node, &pub_key);
            self.write_artifacts(&artifacts)?;

            info!(
                "Configured tinc network {} as {} with {} peer(s) and {} route(s)",
                self.id,
                self_node.id,
                config.nodes.len() - 1,
                config.routes.len()
            );
            Ok(())
        })
    }

    fn pub_key(&self) -> Result<String> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            self.keys.public_key()
        })
    }

    fn regenerate_keys(&self) -> Result<String> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            info!("Regenerating key pair for tinc network {}", self.id);
            self.keys.regenerate()
        })
    }

    fn state(&self) -> Result<NetworkState> {
        self.ctx.scoped(&self.id, || {
            self.ensure_exists()?;
            let service = &self.ctx.service;
            let state = if service.is_active(&self.unit)? {
                NetworkState::Running
            } else if service.is_installed(&self.unit) {
                NetworkState::Stopped
            } else if self.paths.main_config().exists() {
                NetworkState::Configured
            } else {
                NetworkState::Created
            };
            Ok(state)
        })
    }
}
