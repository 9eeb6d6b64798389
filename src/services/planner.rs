use crate::domain::{
    BundleCategory, DocCategory, InstallReport, InstallationManifest,
};
use crate::infra::fs_ops;
use crate::services::{BundleInstaller, ContainerService, DocumentationInstaller, InstallOptions};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Walks a bundle repository and installs every category it is allowed to
pub struct InstallPlanner {
    bundle_installer: BundleInstaller,
    doc_installer: DocumentationInstaller,
    container_service: Arc<ContainerService>,
    documentation_service: String,
}

impl InstallPlanner {
    pub fn new(
        bundle_installer: BundleInstaller,
        doc_installer: DocumentationInstaller,
        container_service: Arc<ContainerService>,
        documentation_service: impl Into<String>,
    ) -> Self {
        Self {
            bundle_installer,
            doc_installer,
            container_service,
            documentation_service: documentation_service.into(),
        }
    }

    /// Installs everything `source_root/config.json` allows.
    ///
    /// Only a missing or broken `config.json` is an error. Missing category
    /// folders and failing bundles are recorded in the report and the run
    /// goes on.
    pub fn install(&self, source_root: &Path, options: &InstallOptions) -> Result<InstallReport> {
        info!("Parsing {}", crate::domain::INSTALLATION_MANIFEST_FILE);
        let manifest = InstallationManifest::load(source_root)?;
        let overrides = manifest.compose_overrides();
        let mut report = InstallReport::default();

        for category in BundleCategory::ALL {
            if manifest.excludes(category) {
                info!("Skipping over {}", category.label());
                report.skipped_categories.push(category.label());
                continue;
            }

            let Some(names) = list_category(source_root, category.source_dir()) else {
                report.skipped_categories.push(category.label());
                continue;
            };

            for name in names {
                let source = source_root.join(category.source_dir()).join(&name);
                let outcome =
                    self.bundle_installer
                        .install(category, &source, &name, &overrides, options);
                report.record(category.label(), &name, outcome);
            }
            info!("Finished processing {}", category.label());
        }

        for category in DocCategory::ALL {
            if manifest.excludes_documentation(category) {
                info!("Skipping over {}", category.label());
                report.skipped_categories.push(category.label());
                continue;
            }

            let Some(names) = list_category(source_root, category.source_dir()) else {
                report.skipped_categories.push(category.label());
                continue;
            };

            for name in names {
                let source = source_root.join(category.source_dir()).join(&name);
                let outcome = self.doc_installer.install(category, &source, &name, options);
                report.record(category.label(), &name, outcome);
            }
            info!("Finished processing {}", category.label());
        }

        report.documentation_restarted = self
            .container_service
            .restart_if_running(&self.documentation_service);

        Ok(report)
    }
}

/// Bundle folders of one category; `None` when the tree does not ship it
fn list_category(source_root: &Path, folder: &str) -> Option<Vec<String>> {
    let dir = source_root.join(folder);

    if !dir.is_dir() {
        warn!("No {folder} folder in {:?}, skipping", source_root);
        return None;
    }

    match fs_ops::subdirectories(&dir) {
        Ok(names) => Some(names),
        Err(e) => {
            warn!("Failed to list contents of {folder}: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BundleOutcome, ContainerState, Layout};
    use crate::infra::config::DocumentationConfig;
    use crate::test_support::{MockServiceManager, write_source_tree};

    struct Fixture {
        root: tempfile::TempDir,
        source: tempfile::TempDir,
        layout: Layout,
        mock: Arc<MockServiceManager>,
        planner: InstallPlanner,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        let layout = Layout::new(root.path());
        let mock = Arc::new(MockServiceManager::new());
        let container_service = Arc::new(ContainerService::new(mock.clone()));
        let planner = InstallPlanner::new(
            BundleInstaller::new(container_service.clone(), layout.clone()),
            DocumentationInstaller::new(
                mock.clone(),
                layout.clone(),
                DocumentationConfig::default(),
            ),
            container_service,
            "mythic_documentation",
        );

        Fixture {
            root,
            source,
            layout,
            mock,
            planner,
        }
    }

    fn yes() -> impl Fn(&str) -> bool {
        |_: &str| true
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let f = fixture();
        let confirm = yes();

        let result = f
            .planner
            .install(f.source.path(), &InstallOptions::new(false, &confirm));

        assert!(result.is_err());
        assert!(f.mock.get_commands().is_empty());
    }

    #[test]
    fn test_exclusions_are_honored_for_every_combination() {
        for mask in 0u8..32 {
            let f = fixture();
            let flag = |bit: u8| mask & (1 << bit) != 0;
            let config = format!(
                r#"{{"exclude_payload_type": {}, "exclude_c2_profiles": {},
                   "exclude_documentation_payload": {}, "exclude_documentation_c2": {},
                   "exclude_documentation_wrapper": {}}}"#,
                flag(0),
                flag(1),
                flag(2),
                flag(3),
                flag(4)
            );
            write_source_tree(
                f.source.path(),
                &config,
                &[
                    ("Payload_Type", "agent"),
                    ("C2_Profiles", "profile"),
                    ("documentation-payload", "agent"),
                    ("documentation-c2", "profile"),
                    ("documentation-wrapper", "wrapper"),
                ],
            )
            .unwrap();
            let confirm = yes();

            let report = f
                .planner
                .install(f.source.path(), &InstallOptions::new(false, &confirm))
                .unwrap();

            let categories = [
                "Payload Type",
                "C2 Profile",
                "Payload documentation",
                "C2 documentation",
                "Wrapper documentation",
            ];
            for (bit, label) in categories.iter().enumerate() {
                let processed = report.results.iter().any(|r| r.category == *label);
                assert_eq!(processed, !flag(bit as u8), "mask {mask:05b}, {label}");
            }
            assert_eq!(
                f.layout.service_dir("agent").exists(),
                !flag(0),
                "mask {mask:05b}"
            );
            assert_eq!(
                f.layout.service_dir("profile").exists(),
                !flag(1),
                "mask {mask:05b}"
            );
        }
    }

    #[test]
    fn test_only_payloads_when_profiles_excluded() {
        let f = fixture();
        write_source_tree(
            f.source.path(),
            r#"{"exclude_c2_profiles": true}"#,
            &[("Payload_Type", "agentX"), ("C2_Profiles", "profileY")],
        )
        .unwrap();
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(false, &confirm))
            .unwrap();

        assert_eq!(report.installed(), vec!["agentX"]);
        assert_eq!(f.mock.manifest_names(), vec!["agentX"]);
        assert!(!f.layout.service_dir("profileY").exists());
        assert!(
            !f.mock
                .get_commands()
                .iter()
                .any(|c| c.contains("profileY"))
        );
    }

    #[test]
    fn test_missing_category_folder_is_skipped() {
        let f = fixture();
        write_source_tree(f.source.path(), "{}", &[("C2_Profiles", "http")]).unwrap();
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(false, &confirm))
            .unwrap();

        assert_eq!(report.installed(), vec!["http"]);
        assert!(report.skipped_categories.contains(&"Payload Type"));
        assert!(report.skipped_categories.contains(&"Wrapper documentation"));
    }

    #[test]
    fn test_one_failing_bundle_does_not_stop_the_batch() {
        let f = fixture();
        write_source_tree(
            f.source.path(),
            "{}",
            &[
                ("Payload_Type", "alpha"),
                ("Payload_Type", "beta"),
                ("C2_Profiles", "http"),
            ],
        )
        .unwrap();
        f.mock.set_fail_on("build:alpha");
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(false, &confirm))
            .unwrap();

        assert!(matches!(
            report.outcome_of("Payload Type", "alpha"),
            Some(BundleOutcome::Failed(_))
        ));
        assert_eq!(report.installed(), vec!["beta", "http"]);
    }

    #[test]
    fn test_replacing_a_bundle_leaves_siblings_alone() {
        let f = fixture();
        for sibling in ["beta", "gamma"] {
            std::fs::create_dir_all(f.layout.service_dir(sibling)).unwrap();
            f.mock.add_manifest_entry(sibling);
        }
        std::fs::create_dir_all(f.layout.service_dir("alpha")).unwrap();
        f.mock.add_manifest_entry("alpha");
        write_source_tree(f.source.path(), "{}", &[("Payload_Type", "alpha")]).unwrap();
        let confirm = yes();

        f.planner
            .install(f.source.path(), &InstallOptions::new(true, &confirm))
            .unwrap();

        assert!(f.layout.service_dir("beta").is_dir());
        assert!(f.layout.service_dir("gamma").is_dir());
        let mut names = f.mock.manifest_names();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert!(f.root.path().join("InstalledServices/alpha/Dockerfile").is_file());
    }

    #[test]
    fn test_documentation_restarted_once_after_all_categories() {
        let f = fixture();
        f.mock
            .add_service("mythic_documentation", ContainerState::Running);
        write_source_tree(
            f.source.path(),
            "{}",
            &[
                ("Payload_Type", "apollo"),
                ("documentation-payload", "apollo"),
                ("documentation-c2", "http"),
            ],
        )
        .unwrap();
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(false, &confirm))
            .unwrap();

        assert!(report.documentation_restarted);
        let commands = f.mock.mutations();
        assert_eq!(
            commands
                .iter()
                .filter(|c| *c == "start:mythic_documentation")
                .count(),
            1
        );
        assert_eq!(commands.last().unwrap(), "start:mythic_documentation");
    }

    #[test]
    fn test_documentation_not_started_when_stopped() {
        let f = fixture();
        write_source_tree(f.source.path(), "{}", &[("documentation-payload", "apollo")]).unwrap();
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(false, &confirm))
            .unwrap();

        assert!(!report.documentation_restarted);
        assert!(f.mock.mutations().is_empty());
    }

    #[test]
    fn test_undeletable_bundle_fails_and_batch_continues() {
        let f = fixture();
        write_source_tree(
            f.source.path(),
            "{}",
            &[("Payload_Type", "alpha"), ("Payload_Type", "beta")],
        )
        .unwrap();
        std::fs::create_dir_all(f.layout.installed_services_dir()).unwrap();
        std::fs::write(f.layout.service_dir("alpha"), "not a folder").unwrap();
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(true, &confirm))
            .unwrap();

        match report.outcome_of("Payload Type", "alpha") {
            Some(BundleOutcome::Failed(reason)) => {
                assert!(reason.contains("removing current version"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.installed(), vec!["beta"]);
        assert_eq!(f.mock.manifest_names(), vec!["beta"]);
    }

    #[test]
    fn test_failing_documentation_does_not_stop_its_category() {
        let f = fixture();
        write_source_tree(
            f.source.path(),
            "{}",
            &[
                ("documentation-payload", "alpha"),
                ("documentation-payload", "beta"),
            ],
        )
        .unwrap();
        let blocked = f.layout.documentation_dir(DocCategory::Payload, "alpha");
        std::fs::create_dir_all(blocked.parent().unwrap()).unwrap();
        std::fs::write(&blocked, "not a folder").unwrap();
        let confirm = yes();

        let report = f
            .planner
            .install(f.source.path(), &InstallOptions::new(true, &confirm))
            .unwrap();

        assert!(matches!(
            report.outcome_of("Payload documentation", "alpha"),
            Some(BundleOutcome::Failed(_))
        ));
        assert_eq!(report.installed(), vec!["beta"]);
        assert!(
            f.layout
                .documentation_dir(DocCategory::Payload, "beta")
                .join("Dockerfile")
                .is_file()
        );
    }
}
