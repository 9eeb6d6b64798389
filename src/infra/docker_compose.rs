use super::compose_store::ComposeStore;
use super::fs_ops;
use crate::domain::{ContainerHealthStatus, ContainerState, Layout, ServiceManager};
use anyhow::{Context, Result, bail};
use serde_yml::{Mapping, Value};
use std::ffi::OsStr;
use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, info, warn};

const VOLUME_HELPER_IMAGE: &str = "alpine";

/// Service manager backed by `docker compose` and the compose file on disk
#[derive(Debug)]
pub struct DockerComposeManager {
    store: ComposeStore,
    layout: Layout,
    core_services: Vec<String>,
}

impl DockerComposeManager {
    pub fn new(layout: Layout, core_services: Vec<String>) -> Self {
        Self {
            store: ComposeStore::new(layout.compose_path()),
            layout,
            core_services,
        }
    }

    /// Container name of a service, as written in its manifest entry
    fn container_name(&self, service: &str) -> String {
        self.store
            .service(service)
            .ok()
            .flatten()
            .and_then(|def| {
                def.get("container_name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| service.to_lowercase())
    }

    fn image_name(&self, service: &str) -> String {
        self.store
            .service(service)
            .ok()
            .flatten()
            .and_then(|def| def.get("image").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| service.to_lowercase())
    }

    fn compose<I, S>(&self, args: I, context: &str) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let status = self.compose_command(args).status().with_context(|| context.to_string())?;
        ensure_success(status, context)
    }

    fn compose_command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .arg("-f")
            .arg(self.store.path())
            .arg("--project-directory")
            .arg(&self.layout.root)
            .args(args.into_iter().map(|item| item.as_ref().to_os_string()));
        cmd
    }

    fn published_ports(definition: &Mapping) -> Vec<String> {
        match definition.get("ports") {
            Some(Value::Sequence(ports)) => ports
                .iter()
                .filter_map(|p| match p {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl ServiceManager for DockerComposeManager {
    fn manager_name(&self) -> &str {
        "docker compose"
    }

    fn service_state(&self, service: &str) -> Result<ContainerState> {
        get_container_state(&self.container_name(service))
    }

    fn get_service_configuration(&self, service: &str) -> Result<Option<Mapping>> {
        self.store.service(service)
    }

    fn set_service_configuration(&self, service: &str, definition: Mapping) -> Result<()> {
        self.store.upsert_service(service, definition)
    }

    fn remove_service_configuration(&self, service: &str) -> Result<()> {
        self.store.remove_service(service)
    }

    fn list_service_names(&self) -> Result<Vec<String>> {
        self.store.service_names()
    }

    fn non_core_service_names(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .service_names()?
            .into_iter()
            .filter(|name| !self.core_services.contains(&name.to_lowercase()))
            .collect())
    }

    fn installed_services_on_disk(&self) -> Result<Vec<String>> {
        let dir = self.layout.installed_services_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        fs_ops::subdirectories(&dir)
    }

    fn get_volumes(&self) -> Result<Mapping> {
        self.store.volumes()
    }

    fn set_volumes(&self, volumes: Mapping) -> Result<()> {
        self.store.set_volumes(volumes)
    }

    fn remove_volume(&self, volume: &str) -> Result<()> {
        let status = docker_status(["volume", "rm", volume], &format!("removing volume {volume}"))?;

        if !status.success() {
            warn!("Could not remove volume {volume} (it may not exist)");
        }

        self.store.remove_volume(volume)
    }

    fn stop_services(&self, services: &[String]) -> Result<()> {
        if services.is_empty() {
            return Ok(());
        }
        let mut args = vec!["stop".to_string()];
        args.extend(services.iter().cloned());
        self.compose(args, &format!("stopping {}", services.join(", ")))
    }

    fn start_services(&self, services: &[String]) -> Result<()> {
        if services.is_empty() {
            return Ok(());
        }
        let mut args = vec!["up".to_string(), "-d".to_string()];
        args.extend(services.iter().cloned());
        self.compose(args, &format!("starting {}", services.join(", ")))
    }

    fn build_services(&self, services: &[String]) -> Result<()> {
        if services.is_empty() {
            return Ok(());
        }
        let mut args = vec![
            "up".to_string(),
            "--build".to_string(),
            "-d".to_string(),
        ];
        args.extend(services.iter().cloned());
        self.compose(args, &format!("building {}", services.join(", ")))
    }

    fn does_image_exist(&self, service: &str) -> Result<bool> {
        let image = self.image_name(service);
        Ok(docker_status(
            ["image", "inspect", image.as_str()],
            &format!("checking image {image}"),
        )?
        .success())
    }

    fn remove_containers(&self, services: &[String]) -> Result<()> {
        if services.is_empty() {
            return Ok(());
        }
        let mut args = vec!["rm".to_string(), "-s".to_string(), "-f".to_string()];
        args.extend(services.iter().cloned());
        self.compose(args, &format!("removing containers {}", services.join(", ")))
    }

    fn get_logs(&self, service: &str, count: usize) -> Result<String> {
        let tail = count.to_string();
        let output = self
            .compose_command(["logs", "--no-color", "--tail", tail.as_str(), service])
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("reading logs of {service}"))?;

        ensure_success(output.status, &format!("reading logs of {service}"))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn health_check(&self, services: &[String]) -> Result<Vec<(String, ContainerHealthStatus)>> {
        let mut statuses = Vec::with_capacity(services.len());

        for service in services {
            let container = self.container_name(service);
            let output = Command::new("docker")
                .args([
                    "container",
                    "inspect",
                    container.as_str(),
                    "--format",
                    "{{if .State.Health}}{{.State.Health.Status}}{{end}}",
                ])
                .stderr(Stdio::null())
                .output()
                .with_context(|| format!("checking health of {container}"))?;

            let status = if output.status.success() {
                ContainerHealthStatus::from_engine(&String::from_utf8_lossy(&output.stdout))
            } else {
                ContainerHealthStatus::Unknown
            };
            statuses.push((service.clone(), status));
        }

        Ok(statuses)
    }

    fn test_ports(&self) -> Result<Vec<(String, u16)>> {
        let mut conflicts = Vec::new();

        for (name, definition) in self.store.services()? {
            let (Some(name), Value::Mapping(definition)) = (name.as_str(), definition) else {
                continue;
            };

            if get_container_state(&self.container_name(name))?.is_running() {
                continue;
            }

            for port in Self::published_ports(&definition)
                .iter()
                .filter_map(|p| host_port(p))
            {
                if TcpListener::bind(("0.0.0.0", port)).is_err() {
                    warn!("Port {port} needed by {name} is already in use");
                    conflicts.push((name.to_string(), port));
                }
            }
        }

        Ok(conflicts)
    }

    fn status(&self) -> Result<Vec<(String, ContainerState)>> {
        self.store
            .service_names()?
            .into_iter()
            .map(|name| -> Result<(String, ContainerState)> {
                let state = get_container_state(&self.container_name(&name))?;
                Ok((name, state))
            })
            .collect()
    }

    fn connection_info(&self) -> Result<Vec<(String, Vec<String>)>> {
        Ok(self
            .store
            .services()?
            .into_iter()
            .filter_map(|(name, def)| match (name, def) {
                (Value::String(name), Value::Mapping(def)) => {
                    Some((name, Self::published_ports(&def)))
                }
                _ => None,
            })
            .collect())
    }

    fn copy_into_volume(&self, source: &Path, destination: &Path, volume: &str) -> Result<()> {
        info!("Streaming {:?} into volume {volume} at {:?}", source, destination);
        let args = volume_copy_args(source, destination, volume)?;
        docker(args, &format!("copying {:?} into volume {volume}", source))
    }
}

/// Replaces `$1` with the contents of `$2`; paths are never spliced into the script
const VOLUME_COPY_SCRIPT: &str = r#"rm -rf "$1" && mkdir -p "$1" && cp -a "$2"/. "$1"/"#;

/// `docker run` arguments that copy `source` into `volume` at `destination`
fn volume_copy_args(source: &Path, destination: &Path, volume: &str) -> Result<Vec<String>> {
    let source = fs::canonicalize(source).with_context(|| format!("resolving {:?}", source))?;
    let source = source.to_string_lossy();
    if source.contains(',') {
        bail!("cannot bind mount {source}: the path contains a comma");
    }
    let target = Path::new("/volume").join(destination);

    Ok(vec![
        "run".into(),
        "--rm".into(),
        "--mount".into(),
        format!("type=bind,src={source},dst=/source,readonly"),
        "--mount".into(),
        format!("type=volume,src={volume},dst=/volume"),
        VOLUME_HELPER_IMAGE.into(),
        "sh".into(),
        "-c".into(),
        VOLUME_COPY_SCRIPT.into(),
        "sh".into(),
        target.to_string_lossy().into_owned(),
        "/source".into(),
    ])
}

/// Host side of a compose port spec (`"7443:7443"`, `"127.0.0.1:80:80/tcp"`, `"8080"`)
fn host_port(spec: &str) -> Option<u16> {
    let spec = spec.split('/').next().unwrap_or(spec);
    let parts: Vec<&str> = spec.split(':').collect();
    let host = match parts.len() {
        1 => parts[0],
        2 => parts[0],
        _ => parts[parts.len() - 2],
    };
    host.parse().ok()
}

fn get_container_state(name: &str) -> Result<ContainerState> {
    let exists = container_exists(name)?;
    if !exists {
        return Ok(ContainerState::NotCreated);
    }

    let running = container_running(name)?;
    Ok(if running {
        ContainerState::Running
    } else {
        ContainerState::Stopped
    })
}

fn container_running(name: &str) -> Result<bool> {
    let status = Command::new("docker")
        .args([
            "container",
            "inspect",
            name,
            "--format",
            "{{.State.Running}}",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("checking state of container {name}"))?;

    if !status.status.success() {
        return Ok(false);
    }

    Ok(String::from_utf8_lossy(&status.stdout).trim() == "true")
}

fn container_exists(name: &str) -> Result<bool> {
    let status = Command::new("docker")
        .args(["container", "inspect", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("checking existence of container {name}"))?;
    debug!("container {name} exists: {}", status.success());
    Ok(status.success())
}

fn docker<I, S>(args: I, context: &str) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let status = docker_status(args, context)?;
    ensure_success(status, context)
}

fn docker_status<I, S>(args: I, context: &str) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new("docker")
        .args(args.into_iter().map(|item| item.as_ref().to_os_string()))
        .status()
        .with_context(|| context.to_string())
}

fn ensure_success(status: ExitStatus, context: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    bail!("docker returned status {:?} ({context})", status)
}
