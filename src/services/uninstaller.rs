use crate::domain::{
    DocCategory, Layout, ServiceKind, ServiceManager, ServiceUnit, UninstallOutcome,
    UninstallReport,
};
use crate::infra::fs_ops;
use crate::services::ContainerService;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Removes installed bundles together with their manifest entry and assets.
///
/// Unlike installs, nothing here is downgraded: a failed step ends the whole
/// uninstall, since a half removed service is worse than an untouched one.
pub struct Uninstaller {
    container_service: Arc<ContainerService>,
    manager: Arc<dyn ServiceManager>,
    layout: Layout,
    protected: Vec<String>,
    documentation_service: String,
}

impl Uninstaller {
    pub fn new(
        container_service: Arc<ContainerService>,
        layout: Layout,
        protected: Vec<String>,
        documentation_service: impl Into<String>,
    ) -> Self {
        let manager = container_service.manager().clone();
        Self {
            container_service,
            manager,
            layout,
            protected: protected.into_iter().map(|p| p.to_lowercase()).collect(),
            documentation_service: documentation_service.into(),
        }
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.contains(&name.to_lowercase())
    }

    /// Uninstalls every requested service, in order.
    ///
    /// All names are validated before anything is touched. Names with no
    /// folder on disk are reported as `NotFound` and skipped.
    pub fn uninstall(&self, names: &[String]) -> Result<UninstallReport> {
        if let Some(name) = names.iter().find(|n| self.is_protected(n)) {
            error!("Trying to uninstall platform services is not allowed");
            bail!("refusing to uninstall core service '{name}'");
        }

        let mut report = UninstallReport::default();

        for name in names {
            let unit = ServiceUnit::new(
                name.as_str(),
                ServiceKind::PayloadBundle,
                &self.layout.installed_services_dir(),
            );

            if !unit.is_on_disk() {
                warn!("Failed to find any service folder named {name}");
                report
                    .results
                    .push((name.clone(), UninstallOutcome::NotFound));
                continue;
            }

            self.remove(&unit)?;
            info!("Successfully uninstalled {name}");
            report.results.push((name.clone(), UninstallOutcome::Removed));
        }

        if !report.removed().is_empty() {
            report.documentation_restarted = self
                .container_service
                .restart_if_running(&self.documentation_service);
        }

        Ok(report)
    }

    fn remove(&self, unit: &ServiceUnit) -> Result<()> {
        let name = unit.name.as_str();

        info!("Stopping and removing container of {name}");
        self.container_service
            .stop_if_running(name)
            .with_context(|| format!("stopping {name}"))?;

        info!("Removing {name} from the service manifest");
        self.manager
            .remove_service_configuration(name)
            .with_context(|| format!("removing manifest entry of {name}"))?;

        info!("Removing {name} folder from disk");
        fs_ops::remove_dir(&unit.path).with_context(|| format!("removing folder of {name}"))?;
        info!("Successfully removed {name}'s folder");

        for category in DocCategory::ALL {
            let docs = self.layout.documentation_dir(category, name);
            if docs.exists() {
                info!("Removing {} of {name}", category.label());
                fs_ops::remove_dir(&docs)
                    .with_context(|| format!("removing {} of {name}", category.label()))?;
            }
        }

        let icon = self.layout.icon_path(name);
        if icon.exists() {
            std::fs::remove_file(&icon)
                .with_context(|| format!("removing UI icon {:?}", icon))?;
            info!("Successfully removed {name}'s old UI icon");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContainerState;
    use crate::infra::config::CORE_SERVICES;
    use crate::test_support::MockServiceManager;
    use std::fs;

    struct Fixture {
        _root: tempfile::TempDir,
        layout: Layout,
        mock: Arc<MockServiceManager>,
        uninstaller: Uninstaller,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let layout = Layout::new(root.path());
        let mock = Arc::new(MockServiceManager::new());
        let uninstaller = Uninstaller::new(
            Arc::new(ContainerService::new(mock.clone())),
            layout.clone(),
            CORE_SERVICES.iter().map(|s| s.to_string()).collect(),
            "mythic_documentation",
        );
        Fixture {
            _root: root,
            layout,
            mock,
            uninstaller,
        }
    }

    fn seed(f: &Fixture, name: &str) {
        fs::create_dir_all(f.layout.service_dir(name)).unwrap();
        f.mock.add_manifest_entry(name);
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_protected_name_is_rejected_before_any_change() {
        let f = fixture();
        seed(&f, "apollo");
        fs::create_dir_all(f.layout.service_dir("mythic_server")).unwrap();

        let result = f
            .uninstaller
            .uninstall(&names(&["apollo", "Mythic_Server"]));

        assert!(result.is_err());
        assert!(f.mock.get_commands().is_empty());
        assert!(f.layout.service_dir("apollo").is_dir());
        assert!(f.layout.service_dir("mythic_server").is_dir());
    }

    #[test]
    fn test_unknown_name_is_not_found_without_mutation() {
        let f = fixture();

        let report = f.uninstaller.uninstall(&names(&["ghost"])).unwrap();

        assert_eq!(report.not_found(), vec!["ghost"]);
        assert!(f.mock.mutations().is_empty());
    }

    #[test]
    fn test_full_removal_order_and_assets() {
        let f = fixture();
        seed(&f, "apollo");
        f.mock.add_service("apollo", ContainerState::Running);
        let agent_docs = f.layout.documentation_dir(DocCategory::Payload, "apollo");
        let wrapper_docs = f.layout.documentation_dir(DocCategory::Wrapper, "apollo");
        fs::create_dir_all(&agent_docs).unwrap();
        fs::create_dir_all(&wrapper_docs).unwrap();
        let icon = f.layout.icon_path("apollo");
        fs::create_dir_all(icon.parent().unwrap()).unwrap();
        fs::write(&icon, "<svg/>").unwrap();

        let report = f.uninstaller.uninstall(&names(&["apollo"])).unwrap();

        assert_eq!(report.removed(), vec!["apollo"]);
        assert_eq!(
            f.mock.mutations(),
            vec!["stop:apollo", "remove_config:apollo"]
        );
        assert!(!f.layout.service_dir("apollo").exists());
        assert!(!agent_docs.exists());
        assert!(!wrapper_docs.exists());
        assert!(!icon.exists());
        assert!(f.mock.manifest_names().is_empty());
    }

    #[test]
    fn test_manifest_failure_aborts_and_keeps_folder() {
        let f = fixture();
        seed(&f, "apollo");
        f.mock.set_fail_on("remove_config:apollo");

        assert!(f.uninstaller.uninstall(&names(&["apollo"])).is_err());
        assert!(f.layout.service_dir("apollo").is_dir());
    }

    #[test]
    fn test_continues_past_first_name() {
        let f = fixture();
        seed(&f, "apollo");
        seed(&f, "http");

        let report = f
            .uninstaller
            .uninstall(&names(&["apollo", "ghost", "http"]))
            .unwrap();

        assert_eq!(report.removed(), vec!["apollo", "http"]);
        assert_eq!(report.not_found(), vec!["ghost"]);
        assert!(f.mock.manifest_names().is_empty());
    }

    #[test]
    fn test_documentation_restarted_once_for_many_removals() {
        let f = fixture();
        seed(&f, "apollo");
        seed(&f, "http");
        f.mock
            .add_service("mythic_documentation", ContainerState::Running);

        let report = f
            .uninstaller
            .uninstall(&names(&["apollo", "http"]))
            .unwrap();

        assert!(report.documentation_restarted);
        let restarts = f
            .mock
            .get_commands()
            .iter()
            .filter(|c| *c == "start:mythic_documentation")
            .count();
        assert_eq!(restarts, 1);
    }

    #[test]
    fn test_icon_removal_failure_stops_remaining_names() {
        let f = fixture();
        seed(&f, "apollo");
        seed(&f, "http");
        let icon = f.layout.icon_path("apollo");
        fs::create_dir_all(icon.join("nested")).unwrap();

        let result = f.uninstaller.uninstall(&names(&["apollo", "http"]));

        assert!(result.is_err());
        assert!(f.layout.service_dir("http").is_dir());
        assert_eq!(f.mock.manifest_names(), vec!["http"]);
        assert!(!f.mock.get_commands().iter().any(|c| c.ends_with(":http")));
    }

    #[test]
    fn test_documentation_removal_failure_is_fatal() {
        let f = fixture();
        seed(&f, "apollo");
        let docs = f.layout.documentation_dir(DocCategory::C2, "apollo");
        fs::create_dir_all(docs.parent().unwrap()).unwrap();
        fs::write(&docs, "not a folder").unwrap();

        assert!(f.uninstaller.uninstall(&names(&["apollo"])).is_err());
        assert!(docs.is_file());
    }

    #[test]
    fn test_folder_removal_failure_is_fatal() {
        let f = fixture();
        fs::create_dir_all(f.layout.installed_services_dir()).unwrap();
        fs::write(f.layout.service_dir("apollo"), "not a folder").unwrap();
        f.mock.add_manifest_entry("apollo");

        let result = f.uninstaller.uninstall(&names(&["apollo"]));

        assert!(result.is_err());
        assert!(f.layout.service_dir("apollo").is_file());
    }
}
