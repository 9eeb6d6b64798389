mod bundle;
mod container;
mod layout;
mod manifest;
mod report;
pub mod traits;

pub use bundle::{BundleCategory, DocCategory, ServiceKind, ServiceUnit};
pub use container::{ContainerHealthStatus, ContainerState};
pub use layout::Layout;
pub use manifest::{INSTALLATION_MANIFEST_FILE, InstallationManifest};
pub use report::{
    BundleOutcome, BundleResult, InstallReport, UninstallOutcome, UninstallReport,
};
pub use traits::{AssumeYes, Confirm, ServiceManager, SourceFetcher};
