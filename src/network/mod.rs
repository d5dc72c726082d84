//! Backend-agnostic network abstraction
//!
//! A [`NetworkManager`] creates, looks up and deletes named networks for one
//! VPN backend; a [`Network`] handle applies topology snapshots to a single
//! network and drives its daemon through the service manager.

mod factory;

pub use factory::{create_manager, create_manager_with_service, BackendKind};

use crate::error::Result;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// One mesh participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Stable node id, used as file name and tinc node name
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Subnets owned by the node inside the mesh
    #[serde(default)]
    pub private_ips: Vec<IpNetwork>,

    /// Externally reachable addresses
    #[serde(default)]
    pub public_ips: Vec<IpAddr>,

    /// Public key material, opaque to the engine
    #[serde(default)]
    pub pub_key: String,
}

/// One static route installed on the self node's interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    /// Destination network
    pub route: IpNetwork,

    /// Next hop; the unspecified address means directly attached
    #[serde(default = "unspecified_gateway")]
    pub gateway: IpAddr,
}

/// Complete topology snapshot applied by the self node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// All mesh participants, self included
    pub nodes: Vec<NodeConfig>,

    /// Id of the node applying this configuration
    pub self_id: String,

    /// Routes installed on the self node's interface
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl NodeConfig {
    /// Create a node with no addresses and no key
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            private_ips: Vec::new(),
            public_ips: Vec::new(),
            pub_key: String::new(),
        }
    }
}

impl RouteConfig {
    /// Route through a concrete next hop
    pub fn via(route: IpNetwork, gateway: IpAddr) -> Self {
        Self { route, gateway }
    }

    /// Directly attached route (no gateway hop)
    pub fn direct(route: IpNetwork) -> Self {
        Self {
            route,
            gateway: unspecified_gateway(),
        }
    }

    /// Whether the route has no gateway hop
    pub fn is_direct(&self) -> bool {
        self.gateway.is_unspecified()
    }
}

impl NetworkConfig {
    /// Check the topology invariants, returning the index of the self node
    pub fn validate(&self) -> Result<usize> {
        crate::config::validate_topology(self)
    }

    /// The self node, if `self_id` resolves
    pub fn self_node(&self) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == self.self_id)
    }

    /// Every node except the self node, in configuration order
    pub fn peers(&self) -> impl Iterator<Item = &NodeConfig> {
        self.nodes.iter().filter(move |n| n.id != self.self_id)
    }
}

fn unspecified_gateway() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Lifecycle state of a network record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Directory scaffold exists, nothing configured
    Created,
    /// Artifacts written, no service unit installed
    Configured,
    /// Service unit active
    Running,
    /// Service unit installed but inactive
    Stopped,
}

impl std::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Configured => write!(f, "configured"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Handle bound to one existing network record
///
/// Callers must serialize mutating operations per network id; handles for
/// different networks are independent.
pub trait Network: Send + Sync {
    /// Network id
    fn id(&self) -> &str;

    /// Install, start and enable the backend service
    fn start(&self) -> Result<()>;

    /// Stop and disable the backend service
    fn stop(&self) -> Result<()>;

    /// Ask the running daemon to re-read its configuration
    fn reload(&self) -> Result<()>;

    /// Replace all on-disk artifacts with ones generated from `config`
    fn set_config(&self, config: &NetworkConfig) -> Result<()>;

    /// Public key of this node, generating a key pair on first use
    fn pub_key(&self) -> Result<String>;

    /// Destroy the current key pair and generate a new one
    fn regenerate_keys(&self) -> Result<String>;

    /// Current lifecycle state
    fn state(&self) -> Result<NetworkState>;
}

/// Creates, finds and deletes networks for one backend
pub trait NetworkManager: Send + Sync {
    /// Backend kind handled by this manager
    fn kind(&self) -> BackendKind;

    /// Create the directory scaffold for a new network
    fn create_network(&self, id: &str) -> Result<Box<dyn Network>>;

    /// Get a handle to an existing network
    fn get_network(&self, id: &str) -> Result<Box<dyn Network>>;

    /// Stop a network and remove its record and service unit
    fn delete_network(&self, id: &str) -> Result<()>;

    /// Ids of all existing networks, sorted
    fn list_networks(&self) -> Result<Vec<String>>;
}
