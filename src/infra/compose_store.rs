use anyhow::{Context, Result, bail};
use serde_yml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SERVICES_KEY: &str = "services";
const VOLUMES_KEY: &str = "volumes";

/// File-backed service manifest (`docker-compose.yml`).
///
/// Nothing is cached: each operation reads the file, applies one change and
/// rewrites it in full, so the file always reflects the last completed call.
#[derive(Debug, Clone)]
pub struct ComposeStore {
    path: PathBuf,
}

impl ComposeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole document; a missing file is an empty manifest
    pub fn load(&self) -> Result<Mapping> {
        if !self.path.exists() {
            return Ok(Mapping::new());
        }

        let content =
            fs::read_to_string(&self.path).with_context(|| format!("reading {:?}", self.path))?;

        if content.trim().is_empty() {
            return Ok(Mapping::new());
        }

        match serde_yml::from_str::<Value>(&content)
            .with_context(|| format!("parsing {:?}", self.path))?
        {
            Value::Mapping(doc) => Ok(doc),
            Value::Null => Ok(Mapping::new()),
            _ => bail!("{:?} is not a mapping at the top level", self.path),
        }
    }

    pub fn save(&self, doc: &Mapping) -> Result<()> {
        let content = serde_yml::to_string(doc).context("serializing compose manifest")?;
        fs::write(&self.path, content).with_context(|| format!("writing {:?}", self.path))?;
        debug!("Manifest persisted to {:?}", self.path);
        Ok(())
    }

    pub fn services(&self) -> Result<Mapping> {
        Ok(section(&self.load()?, SERVICES_KEY))
    }

    pub fn service(&self, name: &str) -> Result<Option<Mapping>> {
        Ok(match self.services()?.get(name) {
            Some(Value::Mapping(def)) => Some(def.clone()),
            Some(_) => Some(Mapping::new()),
            None => None,
        })
    }

    pub fn service_names(&self) -> Result<Vec<String>> {
        Ok(self
            .services()?
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect())
    }

    pub fn upsert_service(&self, name: &str, definition: Mapping) -> Result<()> {
        self.update_section(SERVICES_KEY, |services| {
            services.insert(Value::String(name.to_string()), Value::Mapping(definition));
        })
    }

    pub fn remove_service(&self, name: &str) -> Result<()> {
        self.update_section(SERVICES_KEY, |services| {
            services.remove(name);
        })
    }

    pub fn volumes(&self) -> Result<Mapping> {
        Ok(section(&self.load()?, VOLUMES_KEY))
    }

    pub fn set_volumes(&self, volumes: Mapping) -> Result<()> {
        self.update_section(VOLUMES_KEY, |current| *current = volumes)
    }

    pub fn remove_volume(&self, name: &str) -> Result<()> {
        self.update_section(VOLUMES_KEY, |volumes| {
            volumes.remove(name);
        })
    }

    fn update_section(&self, key: &str, apply: impl FnOnce(&mut Mapping)) -> Result<()> {
        let mut doc = self.load()?;
        let mut current = section(&doc, key);
        apply(&mut current);
        doc.insert(Value::String(key.to_string()), Value::Mapping(current));
        self.save(&doc)
    }
}

fn section(doc: &Mapping, key: &str) -> Mapping {
    match doc.get(key) {
        Some(Value::Mapping(m)) => m.clone(),
        _ => Mapping::new(),
    }
}

/// Generated compose entry of a payload type or C2 profile.
///
/// `overrides` come from the bundle's `config.json` and replace generated
/// keys one for one.
pub fn bundle_service_definition(name: &str, build_context: &str, overrides: &Mapping) -> Mapping {
    let service = name.to_lowercase();
    let mut build = Mapping::new();
    build.insert("context".into(), build_context.into());
    build.insert("args".into(), Value::Sequence(Vec::new()));

    let mut def = Mapping::new();
    def.insert("build".into(), Value::Mapping(build));
    def.insert("image".into(), service.as_str().into());
    def.insert("container_name".into(), service.as_str().into());
    def.insert("hostname".into(), service.as_str().into());
    def.insert("restart".into(), "always".into());
    def.insert("network_mode".into(), "host".into());
    def.insert("labels".into(), Value::Mapping(bundle_labels(&service)));
    def.insert(
        "environment".into(),
        Value::Sequence(vec![
            "MYTHIC_ADDRESS=http://${MYTHIC_SERVER_HOST}:${MYTHIC_SERVER_PORT}/agent_message"
                .into(),
            "MYTHIC_WEBSOCKET=ws://${MYTHIC_SERVER_HOST}:${MYTHIC_SERVER_PORT}/ws/agent_message"
                .into(),
            "RABBITMQ_USER=${RABBITMQ_USER}".into(),
            "RABBITMQ_PASSWORD=${RABBITMQ_PASSWORD}".into(),
            "RABBITMQ_HOST=${RABBITMQ_HOST}".into(),
            "RABBITMQ_PORT=${RABBITMQ_PORT}".into(),
        ]),
    );

    for (key, value) in overrides {
        def.insert(key.clone(), value.clone());
    }

    def
}

/// Compose entry of the sync service, which talks to the server's GraphQL API
pub fn sync_service_definition(name: &str, build_context: &str) -> Mapping {
    let mut build = Mapping::new();
    build.insert("context".into(), build_context.into());

    let mut def = Mapping::new();
    def.insert("build".into(), Value::Mapping(build));
    def.insert("image".into(), name.into());
    def.insert("container_name".into(), name.into());
    def.insert("hostname".into(), name.into());
    def.insert("restart".into(), "always".into());
    def.insert(
        "environment".into(),
        Value::Sequence(vec![
            "MYTHIC_IP=${NGINX_HOST}".into(),
            "MYTHIC_PORT=${NGINX_PORT}".into(),
            "MYTHIC_USERNAME=${MYTHIC_ADMIN_USER}".into(),
            "MYTHIC_PASSWORD=${MYTHIC_ADMIN_PASSWORD}".into(),
            "GHOSTWRITER_API_KEY=${GHOSTWRITER_API_KEY}".into(),
            "GHOSTWRITER_URL=${GHOSTWRITER_URL}".into(),
            "GHOSTWRITER_OPLOG_ID=${GHOSTWRITER_OPLOG_ID}".into(),
        ]),
    );
    def
}

fn bundle_labels(service: &str) -> Mapping {
    let mut labels = Mapping::new();
    labels.insert("mythic.bundle".into(), service.into());
    labels
}
