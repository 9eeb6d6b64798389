use super::{ContainerHealthStatus, ContainerState};
use anyhow::Result;
use serde_yml::Mapping;
use std::fmt::Debug;
use std::path::Path;

/// Lifecycle and manifest operations of the engine backing the platform.
///
/// Every call that changes the manifest (service or volume configuration)
/// persists it before returning.
pub trait ServiceManager: Send + Sync + Debug {
    /// Human readable name of the backing engine
    fn manager_name(&self) -> &str;

    /// Current state of a service's container
    fn service_state(&self, service: &str) -> Result<ContainerState>;

    /// Manifest entry of a service, if one exists
    fn get_service_configuration(&self, service: &str) -> Result<Option<Mapping>>;

    /// Creates or replaces the manifest entry of a service
    fn set_service_configuration(&self, service: &str, definition: Mapping) -> Result<()>;

    /// Removes the manifest entry of a service (no-op if absent)
    fn remove_service_configuration(&self, service: &str) -> Result<()>;

    /// Every service name present in the manifest
    fn list_service_names(&self) -> Result<Vec<String>>;

    /// Manifest names that are not core platform services
    fn non_core_service_names(&self) -> Result<Vec<String>>;

    /// Names of the bundle folders present in the installed services folder
    fn installed_services_on_disk(&self) -> Result<Vec<String>>;

    fn get_volumes(&self) -> Result<Mapping>;

    fn set_volumes(&self, volumes: Mapping) -> Result<()>;

    /// Deletes a volume and drops it from the manifest
    fn remove_volume(&self, volume: &str) -> Result<()>;

    fn stop_services(&self, services: &[String]) -> Result<()>;

    fn start_services(&self, services: &[String]) -> Result<()>;

    /// Rebuilds the images of the services and starts fresh containers
    fn build_services(&self, services: &[String]) -> Result<()>;

    fn does_image_exist(&self, service: &str) -> Result<bool>;

    /// Stops and deletes the containers of the services
    fn remove_containers(&self, services: &[String]) -> Result<()>;

    /// Most recent `count` log lines of a service
    fn get_logs(&self, service: &str, count: usize) -> Result<String>;

    fn health_check(&self, services: &[String]) -> Result<Vec<(String, ContainerHealthStatus)>>;

    /// Host ports required by the manifest that are already taken
    fn test_ports(&self) -> Result<Vec<(String, u16)>>;

    /// State of every service in the manifest
    fn status(&self) -> Result<Vec<(String, ContainerState)>>;

    /// Published ports of every service in the manifest
    fn connection_info(&self) -> Result<Vec<(String, Vec<String>)>>;

    /// Replaces `destination` inside `volume` with the contents of `source`
    fn copy_into_volume(&self, source: &Path, destination: &Path, volume: &str) -> Result<()>;
}

/// Materializes remote source trees
pub trait SourceFetcher: Send + Sync + Debug {
    /// Fetches `url` (optionally at `branch`) into `destination`
    fn fetch(&self, url: &str, branch: Option<&str>, destination: &Path) -> Result<()>;

    /// Cheap check that `url` resolves to a repository
    fn remote_exists(&self, url: &str) -> bool;
}

/// Answers yes/no questions raised before destructive steps
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, question: &str) -> bool {
        self(question)
    }
}

/// Accepts every question
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}
