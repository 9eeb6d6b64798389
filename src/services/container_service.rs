use crate::domain::{ContainerState, ServiceManager};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Single-service lifecycle helpers on top of the service manager.
///
/// State is always asked fresh from the manager right before acting on it.
pub struct ContainerService {
    manager: Arc<dyn ServiceManager>,
}

impl ContainerService {
    pub fn new(manager: Arc<dyn ServiceManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<dyn ServiceManager> {
        &self.manager
    }

    pub fn is_running(&self, name: &str) -> Result<bool> {
        Ok(self.manager.service_state(name)?.is_running())
    }

    /// Stops the service if it is running; returns whether a stop was issued
    pub fn stop_if_running(&self, name: &str) -> Result<bool> {
        match self.manager.service_state(name)? {
            ContainerState::Running => {
                info!("Stopping current container {name}");
                self.manager.stop_services(&[name.to_string()])?;
                Ok(true)
            }
            ContainerState::Stopped | ContainerState::NotCreated => {
                debug!("{name} is not running");
                Ok(false)
            }
        }
    }

    pub fn start(&self, name: &str) -> Result<()> {
        info!("Starting {name}...");
        self.manager.start_services(&[name.to_string()])
    }

    pub fn build(&self, name: &str) -> Result<()> {
        info!("Building and starting {name}...");
        self.manager.build_services(&[name.to_string()])
    }

    /// Restarts the service only if it is currently running.
    ///
    /// Failures are logged and reported as `false`; a restart is never worth
    /// failing the surrounding operation.
    pub fn restart_if_running(&self, name: &str) -> bool {
        match self.is_running(name) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("Could not check state of {name}: {e}");
                return false;
            }
        }

        info!("Restarting {name} container to pull in changes");
        let names = [name.to_string()];

        if let Err(e) = self.manager.stop_services(&names) {
            warn!("Failed to stop {name}: {e}");
        }

        match self.manager.start_services(&names) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to start {name}: {e}");
                false
            }
        }
    }
}
