use crate::domain::{Layout, ServiceManager};
use crate::infra::config::{AppConfig, load_app_config};
use crate::infra::{DockerComposeManager, GitFetcher};
use crate::services::Orchestrator;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, wired once from the config directory
pub struct AppContext {
    pub config: AppConfig,
    pub layout: Layout,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config = load_app_config(config_dir)?;
        let layout = config.layout()?;
        debug!("Platform root: {:?}", layout.root);

        let manager: Arc<dyn ServiceManager> = Arc::new(DockerComposeManager::new(
            layout.clone(),
            config.services.protected_names(),
        ));
        let orchestrator = Orchestrator::new(
            manager,
            Arc::new(GitFetcher::new()),
            layout.clone(),
            &config,
        );

        Ok(Self {
            config,
            layout,
            orchestrator,
        })
    }

    pub fn manager(&self) -> &Arc<dyn ServiceManager> {
        self.orchestrator.manager()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let ctx = AppContext::load(dir.path()).unwrap();

        assert_eq!(ctx.manager().manager_name(), "docker compose");
        assert_eq!(ctx.layout.compose_path(), Path::new("./docker-compose.yml"));
    }

    #[test]
    fn test_load_uses_configured_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mythic-ctl.toml"),
            "[paths]\nroot = \"/opt/mythic\"\n",
        )
        .unwrap();

        let ctx = AppContext::load(dir.path()).unwrap();

        assert_eq!(ctx.orchestrator.layout().root, Path::new("/opt/mythic"));
    }
}
