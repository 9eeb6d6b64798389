use crate::domain::{Layout, ServiceKind, ServiceManager, ServiceUnit};
use crate::infra::compose_store::sync_service_definition;
use crate::infra::fs_ops;
use crate::services::ContainerService;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Installs and removes the sync service, which has a fixed name and is
/// only started when the platform server is already up
pub struct SyncServiceInstaller {
    container_service: Arc<ContainerService>,
    manager: Arc<dyn ServiceManager>,
    layout: Layout,
    sync_name: String,
    server_name: String,
}

impl SyncServiceInstaller {
    pub fn new(
        container_service: Arc<ContainerService>,
        layout: Layout,
        sync_name: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        let manager = container_service.manager().clone();
        Self {
            container_service,
            manager,
            layout,
            sync_name: sync_name.into(),
            server_name: server_name.into(),
        }
    }

    fn unit(&self) -> ServiceUnit {
        ServiceUnit::new(
            self.sync_name.as_str(),
            ServiceKind::SyncService,
            &self.layout.installed_services_dir(),
        )
    }

    /// Replaces the installed sync service with the folder at `source`
    pub fn install_folder(&self, source: &Path) -> Result<()> {
        let unit = self.unit();
        let name = unit.name.as_str();

        if !source.is_dir() {
            bail!("sync service source {:?} is not a directory", source);
        }

        self.container_service
            .stop_if_running(name)
            .with_context(|| format!("stopping {name}"))?;

        if unit.is_on_disk() {
            info!("Removing current version of {name}");
            fs_ops::remove_dir(&unit.path)
                .with_context(|| format!("removing current version of {name}"))?;
        }

        info!("Copying new version of {name} into place");
        fs_ops::copy_dir(source, &unit.path).with_context(|| format!("copying {name}"))?;

        info!("Adding {name} into the service manifest");
        self.manager
            .set_service_configuration(
                name,
                sync_service_definition(name, &self.layout.build_context(name)),
            )
            .with_context(|| format!("adding {name} to the service manifest"))?;

        match self.container_service.is_running(&self.server_name) {
            Ok(true) => {
                if let Err(e) = self.container_service.build(name) {
                    error!("Failed to start {name}: {e:#}");
                }
            }
            Ok(false) => info!(
                "{} is not running, {name} will start with the platform",
                self.server_name
            ),
            Err(e) => warn!("Could not check state of {}: {e}", self.server_name),
        }

        info!("Successfully installed {name}");
        Ok(())
    }

    /// Stops and removes the sync service; a missing folder is only a warning
    pub fn uninstall(&self) -> Result<()> {
        let unit = self.unit();
        let name = unit.name.as_str();

        self.container_service
            .stop_if_running(name)
            .with_context(|| format!("stopping {name}"))?;

        self.manager
            .remove_service_configuration(name)
            .with_context(|| format!("removing {name} from the service manifest"))?;

        if !unit.is_on_disk() {
            warn!("{name} was not installed on disk");
            return Ok(());
        }

        fs_ops::remove_dir(&unit.path).with_context(|| format!("removing folder of {name}"))?;
        info!("Successfully removed {name}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContainerState;
    use crate::test_support::MockServiceManager;
    use serde_yml::Value;
    use std::fs;

    fn setup() -> (
        tempfile::TempDir,
        Layout,
        Arc<MockServiceManager>,
        SyncServiceInstaller,
    ) {
        let root = tempfile::tempdir().unwrap();
        let layout = Layout::new(root.path());
        let mock = Arc::new(MockServiceManager::new());
        let installer = SyncServiceInstaller::new(
            Arc::new(ContainerService::new(mock.clone())),
            layout.clone(),
            "mythic_sync",
            "mythic_server",
        );
        (root, layout, mock, installer)
    }

    fn sync_source() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM sync").unwrap();
        dir
    }

    #[test]
    fn test_install_without_server_only_registers() {
        let (_root, layout, mock, installer) = setup();
        let source = sync_source();

        installer.install_folder(source.path()).unwrap();

        assert!(layout.service_dir("mythic_sync").join("Dockerfile").is_file());
        assert_eq!(mock.mutations(), vec!["set_config:mythic_sync"]);
        let entry = mock.get_service_configuration("mythic_sync").unwrap().unwrap();
        assert_eq!(
            entry.get("container_name"),
            Some(&Value::String("mythic_sync".into()))
        );
    }

    #[test]
    fn test_install_starts_when_server_running() {
        let (_root, _layout, mock, installer) = setup();
        mock.add_service("mythic_server", ContainerState::Running);
        mock.add_service("mythic_sync", ContainerState::Running);

        installer.install_folder(sync_source().path()).unwrap();

        assert_eq!(
            mock.mutations(),
            vec!["stop:mythic_sync", "set_config:mythic_sync", "build:mythic_sync"]
        );
    }

    #[test]
    fn test_start_failure_does_not_fail_install() {
        let (_root, _layout, mock, installer) = setup();
        mock.add_service("mythic_server", ContainerState::Running);
        mock.set_fail_on("build:mythic_sync");

        assert!(installer.install_folder(sync_source().path()).is_ok());
        assert_eq!(mock.manifest_names(), vec!["mythic_sync"]);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let (root, _layout, mock, installer) = setup();

        assert!(installer.install_folder(&root.path().join("nope")).is_err());
        assert!(mock.get_commands().is_empty());
    }

    #[test]
    fn test_uninstall_removes_entry_and_folder() {
        let (_root, layout, mock, installer) = setup();
        installer.install_folder(sync_source().path()).unwrap();

        installer.uninstall().unwrap();

        assert!(!layout.service_dir("mythic_sync").exists());
        assert!(mock.manifest_names().is_empty());
    }

    #[test]
    fn test_uninstall_when_not_on_disk_is_ok() {
        let (_root, _layout, mock, installer) = setup();

        installer.uninstall().unwrap();

        assert_eq!(mock.mutations(), vec!["remove_config:mythic_sync"]);
    }
}
