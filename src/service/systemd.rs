//! Systemd service integration for Linux
//!
//! Unit files are written to the configured unit directory and controlled
//! with `systemctl`. Exit status and output of a failed `systemctl` call are
//! surfaced verbatim in the error.

use super::runner::{command_line, CommandOutput, CommandRunner};
use super::{ServiceManager, ServiceUnit};
use crate::error::{AgentError, Result};
use crate::security::{write_file, SecureFileMode};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Systemd service manager
pub struct SystemdServiceManager {
    unit_dir: PathBuf,
    systemctl: PathBuf,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl SystemdServiceManager {
    /// Create a new systemd service manager
    pub fn new(
        unit_dir: PathBuf,
        systemctl: PathBuf,
        timeout: Duration,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            unit_dir,
            systemctl,
            timeout,
            runner,
        }
    }

    /// Path of the unit file for `name`
    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{}.service", name))
    }

    /// Run systemctl and return its output whatever the exit status
    fn systemctl(&self, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(&self.systemctl, &args, self.timeout)
    }

    /// Run systemctl and fail on a non-zero exit
    fn systemctl_checked(&self, args: &[&str]) -> Result<()> {
        let output = self.systemctl(args)?;
        if !output.success {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            return Err(AgentError::ServiceControl {
                command: command_line(&self.systemctl, &args),
                detail: output.describe(),
            });
        }
        Ok(())
    }
}

impl ServiceManager for SystemdServiceManager {
    fn install(&self, unit: &ServiceUnit) -> Result<()> {
        let path = self.unit_path(&unit.name);
        info!("Installing systemd unit {:?}", path);
        write_file(&path, unit.render_systemd().as_bytes(), SecureFileMode::Config)?;
        self.systemctl_checked(&["daemon-reload"])
    }

    fn uninstall(&self, name: &str) -> Result<()> {
        let path = self.unit_path(name);
        if !path.exists() {
            debug!("Unit {} not installed, nothing to remove", name);
            return Ok(());
        }

        info!("Removing systemd unit {:?}", path);
        let definition = fs::read(&path).map_err(|e| AgentError::io(&path, e))?;
        fs::remove_file(&path).map_err(|e| AgentError::io(&path, e))?;

        // Put the file back so a retry still finds the unit and reloads again
        if let Err(e) = self.systemctl_checked(&["daemon-reload"]) {
            warn!("daemon-reload failed, restoring unit file {:?}", path);
            write_file(&path, &definition, SecureFileMode::Config)?;
            return Err(e);
        }
        Ok(())
    }

    fn is_installed(&self, name: &str) -> bool {
        self.unit_path(name).exists()
    }

    fn start(&self, name: &str) -> Result<()> {
        info!("Starting unit {}", name);
        self.systemctl_checked(&["start", name])
    }

    fn stop(&self, name: &str) -> Result<()> {
        if !self.is_installed(name) {
            debug!("Unit {} not installed, nothing to stop", name);
            return Ok(());
        }
        info!("Stopping unit {}", name);
        self.systemctl_checked(&["stop", name])
    }

    fn enable(&self, name: &str) -> Result<()> {
        info!("Enabling unit {}", name);
        self.systemctl_checked(&["enable", name])
    }

    fn disable(&self, name: &str) -> Result<()> {
        if !self.is_installed(name) {
            debug!("Unit {} not installed, nothing to disable", name);
            return Ok(());
        }
        info!("Disabling unit {}", name);
        self.systemctl_checked(&["disable", name])
    }

    fn reload(&self, name: &str) -> Result<()> {
        info!("Sending SIGHUP to unit {}", name);
        self.systemctl_checked(&["kill", "-s", "HUP", name])
    }

    fn is_active(&self, name: &str) -> Result<bool> {
        if !self.is_installed(name) {
            return Ok(false);
        }
        // is-active exits non-zero for inactive units; that is an answer, not a failure
        Ok(self.systemctl(&["is-active", "--quiet", name])?.success)
    }
}
