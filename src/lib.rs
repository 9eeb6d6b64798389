pub mod cli;
pub mod domain;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{
    BundleCategory, BundleOutcome, ContainerState, DocCategory, InstallReport, Layout,
    ServiceManager, SourceFetcher, UninstallReport,
};
pub use infra::{DockerComposeManager, GitFetcher};
pub use services::{InstallOptions, Orchestrator};
