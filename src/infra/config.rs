use crate::domain::{DocCategory, Layout};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "mythic-ctl.toml";

/// Core platform services that can never be uninstalled as bundles
pub const CORE_SERVICES: &[&str] = &[
    "mythic_postgres",
    "mythic_react",
    "mythic_server",
    "mythic_nginx",
    "mythic_rabbitmq",
    "mythic_graphql",
    "mythic_documentation",
    "mythic_jupyter",
    "mythic_sync",
    "mythic_grafana",
    "mythic_prometheus",
    "mythic_postgres_exporter",
];

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config/mythic-ctl")
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct PathsConfig {
    pub root: Option<String>,
    pub installed_services: Option<PathBuf>,
    pub compose_file: Option<PathBuf>,
    pub documentation_content: Option<PathBuf>,
    pub icons: Option<PathBuf>,
}

/// Mount strategy for one documentation category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStrategy {
    /// Copy into the local documentation content tree
    LocalBind,
    /// Stream into the documentation volume
    Volume,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DocumentationConfig {
    #[serde(default = "default_true")]
    pub payload_bind_local_mount: bool,
    #[serde(default = "default_true")]
    pub c2_bind_local_mount: bool,
    #[serde(default = "default_true")]
    pub wrapper_bind_local_mount: bool,
    #[serde(default = "default_documentation_volume")]
    pub volume: String,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            payload_bind_local_mount: true,
            c2_bind_local_mount: true,
            wrapper_bind_local_mount: true,
            volume: default_documentation_volume(),
        }
    }
}

impl DocumentationConfig {
    pub fn strategy(&self, category: DocCategory) -> MountStrategy {
        let local = match category {
            DocCategory::Payload => self.payload_bind_local_mount,
            DocCategory::C2 => self.c2_bind_local_mount,
            DocCategory::Wrapper => self.wrapper_bind_local_mount,
        };

        if local {
            MountStrategy::LocalBind
        } else {
            MountStrategy::Volume
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServicesConfig {
    #[serde(default = "default_documentation_service")]
    pub documentation: String,
    #[serde(default = "default_server_service")]
    pub server: String,
    #[serde(default = "default_sync_service")]
    pub sync: String,
    /// Extra names refused by uninstall, on top of the core services
    #[serde(default)]
    pub protected: Vec<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            documentation: default_documentation_service(),
            server: default_server_service(),
            sync: default_sync_service(),
            protected: Vec::new(),
        }
    }
}

impl ServicesConfig {
    pub fn protected_names(&self) -> Vec<String> {
        CORE_SERVICES
            .iter()
            .map(|s| s.to_string())
            .chain(self.protected.iter().map(|s| s.to_lowercase()))
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_agents_namespace")]
    pub agents: String,
    #[serde(default = "default_c2_namespace")]
    pub c2_profiles: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            agents: default_agents_namespace(),
            c2_profiles: default_c2_namespace(),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub documentation: DocumentationConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl AppConfig {
    /// Resolves the on-disk layout, expanding `~` and env vars in the root
    pub fn layout(&self) -> Result<Layout> {
        let raw_root = self.paths.root.as_deref().unwrap_or(".");
        let root = shellexpand::full(raw_root)
            .with_context(|| format!("expanding root path {raw_root}"))?;
        let mut layout = Layout::new(PathBuf::from(root.as_ref()));

        if let Some(p) = &self.paths.installed_services {
            layout.installed_services = p.clone();
        }
        if let Some(p) = &self.paths.compose_file {
            layout.compose_file = p.clone();
        }
        if let Some(p) = &self.paths.documentation_content {
            layout.documentation_content = p.clone();
        }
        if let Some(p) = &self.paths.icons {
            layout.icons = p.clone();
        }

        Ok(layout)
    }
}

/// Loads `mythic-ctl.toml` from `config_dir`, falling back to defaults when absent
pub fn load_app_config(config_dir: &Path) -> Result<AppConfig> {
    let path = config_dir.join(DEFAULT_CONFIG_FILE_NAME);

    if !path.exists() {
        debug!("No config at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("parsing {:?}", path))
}

fn default_true() -> bool {
    true
}

fn default_documentation_volume() -> String {
    "mythic_documentation_volume".to_string()
}

fn default_documentation_service() -> String {
    "mythic_documentation".to_string()
}

fn default_server_service() -> String {
    "mythic_server".to_string()
}

fn default_sync_service() -> String {
    "mythic_sync".to_string()
}

fn default_agents_namespace() -> String {
    "https://github.com/MythicAgents".to_string()
}

fn default_c2_namespace() -> String {
    "https://github.com/MythicC2Profiles".to_string()
}
