use crate::domain::{
    BundleCategory, BundleOutcome, Confirm, Layout, ServiceKind, ServiceManager, ServiceUnit,
};
use crate::infra::compose_store::bundle_service_definition;
use crate::infra::fs_ops;
use crate::services::ContainerService;
use serde_yml::Mapping;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How to treat bundles that are already installed
pub struct InstallOptions<'a> {
    /// Replace existing bundles without asking
    pub overwrite: bool,
    pub confirm: &'a dyn Confirm,
}

impl<'a> InstallOptions<'a> {
    pub fn new(overwrite: bool, confirm: &'a dyn Confirm) -> Self {
        Self { overwrite, confirm }
    }

    /// Whether an existing installation may be replaced
    pub fn approves_replacement(&self, question: &str) -> bool {
        self.overwrite || self.confirm.confirm(question)
    }
}

/// Installs one payload type or C2 profile into the installed services folder
pub struct BundleInstaller {
    container_service: Arc<ContainerService>,
    manager: Arc<dyn ServiceManager>,
    layout: Layout,
}

impl BundleInstaller {
    pub fn new(container_service: Arc<ContainerService>, layout: Layout) -> Self {
        let manager = container_service.manager().clone();
        Self {
            container_service,
            manager,
            layout,
        }
    }

    /// Runs the ordered install of one bundle.
    ///
    /// Order: confirm, stop, delete, copy, manifest upsert, build. A failing
    /// step ends this bundle only; it never touches any other bundle.
    pub fn install(
        &self,
        category: BundleCategory,
        source: &Path,
        name: &str,
        overrides: &Mapping,
        options: &InstallOptions,
    ) -> BundleOutcome {
        info!("Processing {} {}", category.label(), name);
        let unit = ServiceUnit::new(name, category.kind(), &self.layout.installed_services_dir());
        let replacing = unit.is_on_disk();

        if replacing {
            if !options.approves_replacement(&format!(
                "{name} already exists. Replace current version?"
            )) {
                warn!("Skipping {}, {}", category.label(), name);
                return BundleOutcome::Skipped("overwrite declined".into());
            }

            if let Err(e) = self.container_service.stop_if_running(name) {
                error!("Failed to stop current container {name}: {e}");
                return BundleOutcome::Failed(format!("stopping container: {e}"));
            }

            info!("Removing current version of {name}");
            if let Err(e) = fs_ops::remove_dir(&unit.path) {
                error!("Failed to remove current version: {e:#}");
                warn!("Continuing to the next {}", category.label());
                return BundleOutcome::Failed(format!("removing current version: {e}"));
            }
            info!("Successfully removed the current version of {name}");
        }

        info!("Copying new version of {name} into place");
        if let Err(e) = fs_ops::copy_dir(source, &unit.path) {
            error!("Failed to copy directory over: {e:#}");
            if replacing && self.has_manifest_entry(name) {
                error!("The manifest entry of {name} now has no folder; run uninstall {name}");
                return BundleOutcome::Failed(format!(
                    "copying bundle: {e}; manifest entry left dangling, run uninstall {name}"
                ));
            }
            return BundleOutcome::Failed(format!("copying bundle: {e}"));
        }

        self.register_and_build(&unit, overrides)
    }

    fn has_manifest_entry(&self, name: &str) -> bool {
        matches!(self.manager.get_service_configuration(name), Ok(Some(_)))
    }

    fn register_and_build(&self, unit: &ServiceUnit, overrides: &Mapping) -> BundleOutcome {
        let name = unit.name.as_str();
        info!("Adding {name} into the service manifest");
        let definition =
            bundle_service_definition(name, &self.layout.build_context(name), overrides);

        if let Err(e) = self.manager.set_service_configuration(name, definition) {
            error!("Failed to add {name} to the service manifest: {e:#}");
            return BundleOutcome::Failed(format!("updating manifest: {e}"));
        }

        if let Err(e) = self.container_service.build(name) {
            error!("Failed to build {name}: {e:#}");
            return BundleOutcome::Failed(format!("building service: {e}"));
        }

        if unit.kind == ServiceKind::PayloadBundle {
            info!("Successfully installed payload type {name}");
        } else {
            info!("Successfully installed c2 profile {name}");
        }
        BundleOutcome::Installed
    }
}
