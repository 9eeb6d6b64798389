mod bundle_installer;
mod container_service;
mod doc_installer;
mod orchestrator;
mod planner;
mod sync_service;
mod uninstaller;

pub use bundle_installer::{BundleInstaller, InstallOptions};
pub use container_service::ContainerService;
pub use doc_installer::DocumentationInstaller;
pub use orchestrator::Orchestrator;
pub use planner::InstallPlanner;
pub use sync_service::SyncServiceInstaller;
pub use uninstaller::Uninstaller;
