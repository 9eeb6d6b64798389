use crate::domain::{BundleOutcome, DocCategory, Layout, ServiceManager, ServiceUnit};
use crate::infra::config::{DocumentationConfig, MountStrategy};
use crate::infra::fs_ops;
use crate::services::InstallOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Installs the documentation set of one bundle.
///
/// Documentation is content, not a service, so nothing is stopped here; the
/// planner restarts the documentation server once at the end of a run.
pub struct DocumentationInstaller {
    manager: Arc<dyn ServiceManager>,
    layout: Layout,
    settings: DocumentationConfig,
}

impl DocumentationInstaller {
    pub fn new(
        manager: Arc<dyn ServiceManager>,
        layout: Layout,
        settings: DocumentationConfig,
    ) -> Self {
        Self {
            manager,
            layout,
            settings,
        }
    }

    pub fn install(
        &self,
        category: DocCategory,
        source: &Path,
        name: &str,
        options: &InstallOptions,
    ) -> BundleOutcome {
        info!("Processing documentation for {name}");

        match self.settings.strategy(category) {
            MountStrategy::LocalBind => self.install_local(category, source, name, options),
            MountStrategy::Volume => self.install_into_volume(category, source, name),
        }
    }

    fn install_local(
        &self,
        category: DocCategory,
        source: &Path,
        name: &str,
        options: &InstallOptions,
    ) -> BundleOutcome {
        let unit = ServiceUnit::documentation(name, self.layout.documentation_dir(category, name));

        if unit.is_on_disk() {
            if !options.approves_replacement(&format!(
                "{name} documentation already exists. Replace current version?"
            )) {
                warn!("Skipping documentation for {name}");
                return BundleOutcome::Skipped("overwrite declined".into());
            }

            info!("Removing current documentation of {name}");
            if let Err(e) = fs_ops::remove_dir(&unit.path) {
                error!("Failed to remove current version: {e:#}");
                warn!("Continuing to the next {}", category.label());
                return BundleOutcome::Failed(format!("removing current documentation: {e}"));
            }
        }

        info!("Copying new documentation into place");
        if let Err(e) = fs_ops::copy_dir(source, &unit.path) {
            error!("Failed to copy documentation over: {e:#}");
            return BundleOutcome::Failed(format!("copying documentation: {e}"));
        }

        BundleOutcome::Installed
    }

    /// Volume writes always replace, so no confirmation is asked
    fn install_into_volume(&self, category: DocCategory, source: &Path, name: &str) -> BundleOutcome {
        let destination = volume_destination(category, name);

        match self
            .manager
            .copy_into_volume(source, &destination, &self.settings.volume)
        {
            Ok(()) => BundleOutcome::Installed,
            Err(e) => {
                error!("Failed to install {} for {name}: {e:#}", category.label());
                BundleOutcome::Failed(format!("streaming into volume: {e}"))
            }
        }
    }
}

/// Path of a bundle's documentation inside the documentation volume
pub fn volume_destination(category: DocCategory, name: &str) -> PathBuf {
    Path::new("content").join(category.content_dir()).join(name)
}
