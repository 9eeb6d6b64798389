use crate::domain::{
    AssumeYes, InstallReport, Layout, ServiceManager, SourceFetcher, UninstallReport,
};
use crate::infra::config::{AppConfig, SourcesConfig};
use crate::services::{
    BundleInstaller, ContainerService, DocumentationInstaller, InstallOptions, InstallPlanner,
    SyncServiceInstaller, Uninstaller,
};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const WORKSPACE_PREFIX: &str = "mythic-install-";

/// Entry points for every install and uninstall workflow.
///
/// Remote sources are fetched into a scoped workspace under the platform
/// root, which is removed however the run ends.
pub struct Orchestrator {
    container_service: Arc<ContainerService>,
    fetcher: Arc<dyn SourceFetcher>,
    layout: Layout,
    sources: SourcesConfig,
    planner: InstallPlanner,
    uninstaller: Uninstaller,
    sync: SyncServiceInstaller,
}

impl Orchestrator {
    pub fn new(
        manager: Arc<dyn ServiceManager>,
        fetcher: Arc<dyn SourceFetcher>,
        layout: Layout,
        config: &AppConfig,
    ) -> Self {
        let container_service = Arc::new(ContainerService::new(manager.clone()));
        let services = &config.services;

        let planner = InstallPlanner::new(
            BundleInstaller::new(container_service.clone(), layout.clone()),
            DocumentationInstaller::new(
                manager,
                layout.clone(),
                config.documentation.clone(),
            ),
            container_service.clone(),
            services.documentation.as_str(),
        );
        let uninstaller = Uninstaller::new(
            container_service.clone(),
            layout.clone(),
            services.protected_names(),
            services.documentation.as_str(),
        );
        let sync = SyncServiceInstaller::new(
            container_service.clone(),
            layout.clone(),
            services.sync.as_str(),
            services.server.as_str(),
        );

        Self {
            container_service,
            fetcher,
            layout,
            sources: config.sources.clone(),
            planner,
            uninstaller,
            sync,
        }
    }

    pub fn manager(&self) -> &Arc<dyn ServiceManager> {
        self.container_service.manager()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Fetches `url` (optionally at `branch`) and installs what it ships
    pub fn install_from_url(
        &self,
        url: &str,
        branch: Option<&str>,
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        self.with_fetched(url, branch, |repo| self.planner.install(repo, options))
    }

    /// Installs a bundle known only by its short name.
    ///
    /// The agent namespace is tried first, then the C2 profile namespace.
    /// Existing installs are always replaced without asking.
    pub fn install_by_name(&self, name: &str) -> Result<InstallReport> {
        let candidates = [&self.sources.agents, &self.sources.c2_profiles]
            .map(|namespace| format!("{}/{}", namespace.trim_end_matches('/'), name));

        for url in &candidates {
            debug!("Checking {url}");
            if self.fetcher.remote_exists(url) {
                info!("Found {name} at {url}");
                return self.install_from_url(url, None, &InstallOptions::new(true, &AssumeYes));
            }
        }

        bail!(
            "could not find {name} under {} or {}",
            self.sources.agents,
            self.sources.c2_profiles
        )
    }

    /// Installs from an already materialized tree; nothing is fetched
    pub fn install_folder(&self, path: &Path, options: &InstallOptions) -> Result<InstallReport> {
        if !path.is_dir() {
            bail!("{:?} is not a directory", path);
        }
        self.planner.install(path, options)
    }

    pub fn uninstall(&self, names: &[String]) -> Result<UninstallReport> {
        self.uninstaller.uninstall(names)
    }

    /// Fetches the sync service repository and installs it
    pub fn sync_install(&self, url: &str, branch: Option<&str>) -> Result<()> {
        self.with_fetched(url, branch, |repo| self.sync.install_folder(repo))
    }

    pub fn sync_install_folder(&self, path: &Path) -> Result<()> {
        self.sync.install_folder(path)
    }

    pub fn sync_uninstall(&self) -> Result<()> {
        self.sync.uninstall()
    }

    fn with_fetched<T>(
        &self,
        url: &str,
        branch: Option<&str>,
        run: impl FnOnce(&Path) -> Result<T>,
    ) -> Result<T> {
        fs::create_dir_all(&self.layout.root)
            .with_context(|| format!("creating {:?}", self.layout.root))?;
        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.layout.root)
            .context("creating install workspace")?;
        let repo = workspace.path().join("repo");

        info!("Cloning {url}");
        self.fetcher
            .fetch(url, branch, &repo)
            .with_context(|| format!("fetching {url}"))?;

        let result = run(&repo);
        debug!("Removing workspace {:?}", workspace.path());
        result
    }
}
