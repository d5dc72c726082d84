//! Service lifecycle control
//!
//! Each network's backend daemon runs as one supervised OS service unit. The
//! [`ServiceManager`] trait is the seam between network handles and the host's
//! service manager (systemd), with an in-process implementation for hosts
//! that have none.

mod ephemeral;
mod runner;
mod systemd;

pub use ephemeral::{EphemeralServiceManager, ServiceEvent};
pub use runner::{command_line, CommandOutput, CommandRunner, SystemCommandRunner};
pub use systemd::SystemdServiceManager;

#[cfg(test)]
pub use runner::MockCommandRunner;

use crate::config::{ServiceManagerKind, ServiceSettings};
use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Description of a supervised service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    /// Unit name without the `.service` suffix
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Program started by the unit
    pub program: PathBuf,
    /// Program arguments
    pub args: Vec<String>,
}

impl ServiceUnit {
    /// Render as a systemd unit file (restart always, started after networking)
    pub fn render_systemd(&self) -> String {
        let mut exec = quote_arg(&self.program.display().to_string());
        for arg in &self.args {
            exec.push(' ');
            exec.push_str(&quote_arg(arg));
        }

        let mut unit = String::new();
        unit.push_str("[Unit]\n");
        unit.push_str(&format!("Description={}\n", self.description));
        unit.push_str("After=network.target\n");
        unit.push_str("Requires=network.target\n");
        unit.push('\n');
        unit.push_str("[Service]\n");
        unit.push_str("Type=simple\n");
        unit.push_str(&format!("ExecStart={}\n", exec));
        unit.push_str("Restart=always\n");
        unit.push('\n');
        unit.push_str("[Install]\n");
        unit.push_str("WantedBy=multi-user.target\n");
        unit
    }
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        return arg.to_string();
    }
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Operations on supervised service units
///
/// `stop`, `disable` and `uninstall` on a unit that is not installed succeed
/// without doing anything.
pub trait ServiceManager: Send + Sync {
    /// Persist the unit description (overwrites an existing one)
    fn install(&self, unit: &ServiceUnit) -> Result<()>;

    /// Remove the unit description
    fn uninstall(&self, name: &str) -> Result<()>;

    /// Whether a unit description is present
    fn is_installed(&self, name: &str) -> bool;

    /// Start the unit
    fn start(&self, name: &str) -> Result<()>;

    /// Stop the unit
    fn stop(&self, name: &str) -> Result<()>;

    /// Start the unit on boot
    fn enable(&self, name: &str) -> Result<()>;

    /// Do not start the unit on boot
    fn disable(&self, name: &str) -> Result<()>;

    /// Signal the running process to re-read its configuration
    fn reload(&self, name: &str) -> Result<()>;

    /// Whether the unit is currently active
    fn is_active(&self, name: &str) -> Result<bool>;
}

/// Build the service manager selected in the settings
pub fn create_service_manager(settings: &ServiceSettings) -> Arc<dyn ServiceManager> {
    match settings.manager {
        ServiceManagerKind::Systemd => {
            info!("Using systemd service manager (units in {:?})", settings.unit_dir);
            Arc::new(SystemdServiceManager::new(
                settings.unit_dir.clone(),
                settings.systemctl_path.clone(),
                settings.command_timeout(),
                Arc::new(SystemCommandRunner::new()),
            ))
        }
        ServiceManagerKind::Ephemeral => {
            info!("Using ephemeral service manager");
            Arc::new(EphemeralServiceManager::new())
        }
    }
}
