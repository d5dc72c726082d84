//! In-process service manager
//!
//! Keeps unit state in memory without launching anything. Used on hosts with
//! no service manager (containers) and by tests, which can inspect the
//! ordered event log.

use super::{ServiceManager, ServiceUnit};
use crate::error::{AgentError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// A state change applied to a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Unit description stored
    Installed(String),
    /// Unit description removed
    Uninstalled(String),
    /// Unit started
    Started(String),
    /// Unit stopped
    Stopped(String),
    /// Unit enabled on boot
    Enabled(String),
    /// Unit disabled on boot
    Disabled(String),
    /// Reload signal delivered
    Reloaded(String),
}

#[derive(Debug, Clone)]
struct UnitRecord {
    definition: String,
    active: bool,
    enabled: bool,
}

/// Service manager that only records state
#[derive(Debug, Default)]
pub struct EphemeralServiceManager {
    units: Mutex<HashMap<String, UnitRecord>>,
    events: Mutex<Vec<ServiceEvent>>,
}

impl EphemeralServiceManager {
    /// Create a manager with no units
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered systemd description of an installed unit
    pub fn unit_definition(&self, name: &str) -> Option<String> {
        lock(&self.units).get(name).map(|u| u.definition.clone())
    }

    /// Whether an installed unit is enabled on boot
    pub fn is_enabled(&self, name: &str) -> bool {
        lock(&self.units).get(name).is_some_and(|u| u.enabled)
    }

    /// All events so far, oldest first
    pub fn events(&self) -> Vec<ServiceEvent> {
        lock(&self.events).clone()
    }

    fn record(&self, event: ServiceEvent) {
        debug!("Service event: {:?}", event);
        lock(&self.events).push(event);
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut UnitRecord)) -> Result<()> {
        let mut units = lock(&self.units);
        let unit = units.get_mut(name).ok_or_else(|| AgentError::ServiceControl {
            command: format!("control {}", name),
            detail: format!("Unit {} not installed", name),
        })?;
        f(unit);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ServiceManager for EphemeralServiceManager {
    fn install(&self, unit: &ServiceUnit) -> Result<()> {
        info!("Installing ephemeral unit {}", unit.name);
        let definition = unit.render_systemd();
        lock(&self.units)
            .entry(unit.name.clone())
            .and_modify(|u| u.definition = definition.clone())
            .or_insert(UnitRecord {
                definition,
                active: false,
                enabled: false,
            });
        self.record(ServiceEvent::Installed(unit.name.clone()));
        Ok(())
    }

    fn uninstall(&self, name: &str) -> Result<()> {
        if lock(&self.units).remove(name).is_some() {
            self.record(ServiceEvent::Uninstalled(name.to_string()));
        }
        Ok(())
    }

    fn is_installed(&self, name: &str) -> bool {
        lock(&self.units).contains_key(name)
    }

    fn start(&self, name: &str) -> Result<()> {
        self.update(name, |u| u.active = true)?;
        self.record(ServiceEvent::Started(name.to_string()));
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        if !self.is_installed(name) {
            return Ok(());
        }
        self.update(name, |u| u.active = false)?;
        self.record(ServiceEvent::Stopped(name.to_string()));
        Ok(())
    }

    fn enable(&self, name: &str) -> Result<()> {
        self.update(name, |u| u.enabled = true)?;
        self.record(ServiceEvent::Enabled(name.to_string()));
        Ok(())
    }

    fn disable(&self, name: &str) -> Result<()> {
        if !self.is_installed(name) {
            return Ok(());
        }
        self.update(name, |u| u.enabled = false)?;
        self.record(ServiceEvent::Disabled(name.to_string()));
        Ok(())
    }

    fn reload(&self, name: &str) -> Result<()> {
        let active = lock(&self.units).get(name).is_some_and(|u| u.active);
        if !active {
            return Err(AgentError::ServiceControl {
                command: format!("kill -s HUP {}", name),
                detail: format!("Unit {} is not active", name),
            });
        }
        self.record(ServiceEvent::Reloaded(name.to_string()));
        Ok(())
    }

    fn is_active(&self, name: &str) -> Result<bool> {
        Ok(lock(&self.units).get(name).is_some_and(|u| u.active))
    }
}
