use crate::domain::{ContainerHealthStatus, ContainerState, ServiceManager, SourceFetcher};
use crate::infra::fs_ops;
use anyhow::{Result, bail};
use serde_yml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct MockService {
    pub name: String,
    pub state: ContainerState,
    pub health_status: Option<ContainerHealthStatus>,
}

/// In-memory service manager that records every call it receives.
///
/// Manifest entries live in memory; `installed_services_on_disk` reads the
/// real directory given to [`MockServiceManager::with_installed_dir`].
#[derive(Debug)]
pub struct MockServiceManager {
    services: RwLock<HashMap<String, MockService>>,
    manifest: RwLock<Mapping>,
    volumes: RwLock<Mapping>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Vec<String>>,
    watched: RwLock<Option<PathBuf>>,
    observations: RwLock<Vec<(String, Option<String>)>>,
    installed_dir: Option<PathBuf>,
    core_services: Vec<String>,
}

impl MockServiceManager {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            manifest: RwLock::new(Mapping::new()),
            volumes: RwLock::new(Mapping::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(Vec::new()),
            watched: RwLock::new(None),
            observations: RwLock::new(Vec::new()),
            installed_dir: None,
            core_services: crate::infra::config::CORE_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_installed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.installed_dir = Some(dir.into());
        self
    }

    pub fn add_service(&self, name: &str, state: ContainerState) {
        self.services.write().unwrap().insert(
            name.to_string(),
            MockService {
                name: name.to_string(),
                state,
                health_status: None,
            },
        );
    }

    /// Seeds a manifest entry without recording a command
    pub fn add_manifest_entry(&self, name: &str) {
        self.manifest
            .write()
            .unwrap()
            .insert(Value::String(name.to_string()), Value::Mapping(Mapping::new()));
    }

    /// Makes `operation` fail, either for every service (`"build"`) or for
    /// one (`"build:apollo"`)
    pub fn set_fail_on(&self, operation: &str) {
        self.fail_on.write().unwrap().push(operation.to_string());
    }

    /// Snapshots the content of `path` every time a mutating command arrives
    pub fn watch_file(&self, path: &Path) {
        *self.watched.write().unwrap() = Some(path.to_path_buf());
    }

    /// `(command, watched file content)` pairs, in arrival order
    pub fn observations(&self) -> Vec<(String, Option<String>)> {
        self.observations.read().unwrap().clone()
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    /// Commands that change containers, the manifest or volumes
    pub fn mutations(&self) -> Vec<String> {
        self.get_commands()
            .into_iter()
            .filter(|c| !c.starts_with("state:"))
            .collect()
    }

    pub fn get_state(&self, name: &str) -> Option<ContainerState> {
        self.services
            .read()
            .unwrap()
            .get(name)
            .map(|c| c.state.clone())
    }

    pub fn set_health_status(&self, name: &str, status: ContainerHealthStatus) {
        if let Some(service) = self.services.write().unwrap().get_mut(name) {
            service.health_status = Some(status);
        }
    }

    pub fn manifest_names(&self) -> Vec<String> {
        self.manifest
            .read()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect()
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());

        if cmd.starts_with("state:") {
            return;
        }
        if let Some(path) = self.watched.read().unwrap().as_ref() {
            let content = fs::read_to_string(path).ok();
            self.observations
                .write()
                .unwrap()
                .push((cmd.to_string(), content));
        }
    }

    fn check_fail(&self, operation: &str, target: &str) -> Result<()> {
        let fail_on = self.fail_on.read().unwrap();
        let scoped = format!("{operation}:{target}");
        if fail_on.iter().any(|f| f == operation || *f == scoped) {
            bail!("Mock failure on: {}", scoped);
        }
        Ok(())
    }

    fn set_state(&self, name: &str, state: ContainerState) {
        let mut services = self.services.write().unwrap();
        services
            .entry(name.to_string())
            .and_modify(|s| s.state = state.clone())
            .or_insert(MockService {
                name: name.to_string(),
                state,
                health_status: None,
            });
    }
}

impl Default for MockServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager for MockServiceManager {
    fn manager_name(&self) -> &str {
        "mock"
    }

    fn service_state(&self, service: &str) -> Result<ContainerState> {
        self.record_command(&format!("state:{}", service));
        self.check_fail("state", service)?;

        Ok(self
            .get_state(service)
            .unwrap_or(ContainerState::NotCreated))
    }

    fn get_service_configuration(&self, service: &str) -> Result<Option<Mapping>> {
        Ok(match self.manifest.read().unwrap().get(service) {
            Some(Value::Mapping(def)) => Some(def.clone()),
            Some(_) => Some(Mapping::new()),
            None => None,
        })
    }

    fn set_service_configuration(&self, service: &str, definition: Mapping) -> Result<()> {
        self.record_command(&format!("set_config:{}", service));
        self.check_fail("set_config", service)?;

        self.manifest
            .write()
            .unwrap()
            .insert(Value::String(service.to_string()), Value::Mapping(definition));
        Ok(())
    }

    fn remove_service_configuration(&self, service: &str) -> Result<()> {
        self.record_command(&format!("remove_config:{}", service));
        self.check_fail("remove_config", service)?;

        self.manifest.write().unwrap().remove(service);
        Ok(())
    }

    fn list_service_names(&self) -> Result<Vec<String>> {
        Ok(self.manifest_names())
    }

    fn non_core_service_names(&self) -> Result<Vec<String>> {
        Ok(self
            .manifest_names()
            .into_iter()
            .filter(|n| !self.core_services.contains(&n.to_lowercase()))
            .collect())
    }

    fn installed_services_on_disk(&self) -> Result<Vec<String>> {
        match &self.installed_dir {
            Some(dir) if dir.is_dir() => fs_ops::subdirectories(dir),
            _ => Ok(Vec::new()),
        }
    }

    fn get_volumes(&self) -> Result<Mapping> {
        Ok(self.volumes.read().unwrap().clone())
    }

    fn set_volumes(&self, volumes: Mapping) -> Result<()> {
        self.record_command("set_volumes");
        self.check_fail("set_volumes", "")?;
        *self.volumes.write().unwrap() = volumes;
        Ok(())
    }

    fn remove_volume(&self, volume: &str) -> Result<()> {
        self.record_command(&format!("remove_volume:{}", volume));
        self.check_fail("remove_volume", volume)?;
        self.volumes.write().unwrap().remove(volume);
        Ok(())
    }

    fn stop_services(&self, services: &[String]) -> Result<()> {
        for name in services {
            self.record_command(&format!("stop:{}", name));
            self.check_fail("stop", name)?;
            if self.get_state(name).is_some() {
                self.set_state(name, ContainerState::Stopped);
            }
        }
        Ok(())
    }

    fn start_services(&self, services: &[String]) -> Result<()> {
        for name in services {
            self.record_command(&format!("start:{}", name));
            self.check_fail("start", name)?;
            self.set_state(name, ContainerState::Running);
        }
        Ok(())
    }

    fn build_services(&self, services: &[String]) -> Result<()> {
        for name in services {
            self.record_command(&format!("build:{}", name));
            self.check_fail("build", name)?;
            self.set_state(name, ContainerState::Running);
        }
        Ok(())
    }

    fn does_image_exist(&self, service: &str) -> Result<bool> {
        self.record_command(&format!("image_exists:{}", service));
        Ok(self.get_state(service).is_some())
    }

    fn remove_containers(&self, services: &[String]) -> Result<()> {
        for name in services {
            self.record_command(&format!("remove_container:{}", name));
            self.check_fail("remove_container", name)?;
            self.services.write().unwrap().remove(name);
        }
        Ok(())
    }

    fn get_logs(&self, service: &str, count: usize) -> Result<String> {
        self.record_command(&format!("logs:{}:{}", service, count));
        self.check_fail("logs", service)?;
        Ok(format!("{service} log line\n"))
    }

    fn health_check(&self, services: &[String]) -> Result<Vec<(String, ContainerHealthStatus)>> {
        let registry = self.services.read().unwrap();
        Ok(services
            .iter()
            .map(|name| {
                let status = registry
                    .get(name)
                    .and_then(|s| s.health_status.clone())
                    .unwrap_or(ContainerHealthStatus::NotApplicable);
                (name.clone(), status)
            })
            .collect())
    }

    fn test_ports(&self) -> Result<Vec<(String, u16)>> {
        Ok(Vec::new())
    }

    fn status(&self) -> Result<Vec<(String, ContainerState)>> {
        Ok(self
            .manifest_names()
            .into_iter()
            .map(|name| {
                let state = self.get_state(&name).unwrap_or(ContainerState::NotCreated);
                (name, state)
            })
            .collect())
    }

    fn connection_info(&self) -> Result<Vec<(String, Vec<String>)>> {
        Ok(self
            .manifest_names()
            .into_iter()
            .map(|name| (name, Vec::new()))
            .collect())
    }

    fn copy_into_volume(&self, source: &Path, destination: &Path, volume: &str) -> Result<()> {
        let destination = destination.to_string_lossy();
        self.record_command(&format!("copy_volume:{}:{}", volume, destination));
        self.check_fail("copy_volume", &destination)?;

        if !source.is_dir() {
            bail!("Mock volume source {:?} is not a directory", source);
        }
        Ok(())
    }
}

/// Fetcher serving prepared local directories in place of remote repositories
#[derive(Debug, Default)]
pub struct MockFetcher {
    repos: RwLock<HashMap<String, PathBuf>>,
    fetches: RwLock<Vec<(String, Option<String>, PathBuf)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repo(&self, url: &str, tree: &Path) {
        self.repos
            .write()
            .unwrap()
            .insert(url.to_string(), tree.to_path_buf());
    }

    /// `(url, branch, destination)` of every fetch, in order
    pub fn fetches(&self) -> Vec<(String, Option<String>, PathBuf)> {
        self.fetches.read().unwrap().clone()
    }
}

impl SourceFetcher for MockFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, destination: &Path) -> Result<()> {
        self.fetches.write().unwrap().push((
            url.to_string(),
            branch.map(str::to_string),
            destination.to_path_buf(),
        ));

        let tree = match self.repos.read().unwrap().get(url) {
            Some(tree) => tree.clone(),
            None => bail!("Mock repository {url} does not exist"),
        };
        fs_ops::copy_dir(&tree, destination)
    }

    fn remote_exists(&self, url: &str) -> bool {
        self.repos.read().unwrap().contains_key(url)
    }
}

/// Writes a bundle repository: `config.json` plus one folder (holding a
/// Dockerfile) per `(category folder, bundle name)` pair
pub fn write_source_tree(root: &Path, config_json: &str, bundles: &[(&str, &str)]) -> Result<()> {
    fs::create_dir_all(root)?;
    fs::write(root.join("config.json"), config_json)?;

    for (category, name) in bundles {
        let dir = root.join(category).join(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("Dockerfile"), format!("FROM scratch\nLABEL name={name}\n"))?;
    }

    Ok(())
}
