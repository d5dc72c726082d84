//! nodearmor main entry point
//!
//! Operator CLI over the orchestration engine. It handles CLI parsing,
//! logging setup and engine construction, then runs one operation.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use nodearmor::{
    config::{load_topology, EngineConfig},
    monitoring::Telemetry,
    network::{create_manager, NetworkManager},
    APP_NAME, VERSION,
};

/// Mesh VPN network orchestration
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        default_value = "/etc/nodearmor/agent.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a network record
    Create {
        /// Network id
        id: String,
    },

    /// Stop a network and remove its record and service unit
    Delete {
        /// Network id
        id: String,
    },

    /// Apply a topology snapshot (JSON or TOML)
    Configure {
        /// Network id
        id: String,

        /// Topology file
        #[arg(short, long)]
        topology: PathBuf,
    },

    /// Install, start and enable the network daemon
    Start {
        /// Network id
        id: String,
    },

    /// Stop and disable the network daemon
    Stop {
        /// Network id
        id: String,
    },

    /// Signal the network daemon to re-read its configuration
    Reload {
        /// Network id
        id: String,
    },

    /// Print this node's public key
    Pubkey {
        /// Network id
        id: String,

        /// Destroy the current key pair and generate a new one
        #[arg(long)]
        regenerate: bool,
    },

    /// Show the lifecycle state of a network
    Status {
        /// Network id
        id: String,
    },

    /// List all networks
    List,

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let telemetry = init_logging(cli.verbose);

    if let Err(e) = run(cli, telemetry) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
///
/// The same dispatcher is installed globally for the binary and handed to
/// the engine explicitly.
fn init_logging(verbose: bool) -> Telemetry {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let dispatch = tracing::Dispatch::new(subscriber);

    if tracing::dispatcher::set_global_default(dispatch.clone()).is_err() {
        eprintln!("Global tracing subscriber already set");
    }

    Telemetry::new(dispatch)
}

/// Engine settings from `path`, or the defaults if it does not exist
fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    if path.exists() {
        info!("Loading config from {:?}", path);
        Ok(EngineConfig::from_file(path)?)
    } else {
        info!("No config at {:?}, using defaults", path);
        Ok(EngineConfig::default())
    }
}

/// Run the CLI command
fn run(cli: Cli, telemetry: Telemetry) -> anyhow::Result<()> {
    let config_path = cli.config;
    let engine = move || -> anyhow::Result<Box<dyn NetworkManager>> {
        let config = load_config(&config_path)?;
        Ok(create_manager(&config, telemetry)?)
    };

    match cli.command {
        Commands::Create { id } => {
            engine()?.create_network(&id)?;
            println!("Created network {}", id);
        }
        Commands::Delete { id } => {
            engine()?.delete_network(&id)?;
            println!("Deleted network {}", id);
        }
        Commands::Configure { id, topology } => {
            let topology = load_topology(&topology)
                .with_context(|| format!("Failed to load topology for network {}", id))?;
            engine()?.get_network(&id)?.set_config(&topology)?;
            println!(
                "Configured network {} with {} node(s)",
                id,
                topology.nodes.len()
            );
        }
        Commands::Start { id } => {
            engine()?.get_network(&id)?.start()?;
            println!("Started network {}", id);
        }
        Commands::Stop { id } => {
            engine()?.get_network(&id)?.stop()?;
            println!("Stopped network {}", id);
        }
        Commands::Reload { id } => {
            engine()?.get_network(&id)?.reload()?;
            println!("Reloaded network {}", id);
        }
        Commands::Pubkey { id, regenerate } => {
            let network = engine()?.get_network(&id)?;
            let key = if regenerate {
                network.regenerate_keys()?
            } else {
                network.pub_key()?
            };
            print!("{}", key);
        }
        Commands::Status { id } => {
            let manager = engine()?;
            let state = manager.get_network(&id)?.state()?;
            println!("{}: {} ({})", id, state, manager.kind());
        }
        Commands::List => {
            for id in engine()?.list_networks()? {
                println!("{}", id);
            }
        }
        Commands::Version => {
            println!("{} v{}", APP_NAME, VERSION);
        }
    }

    Ok(())
}
