use super::{BundleCategory, DocCategory};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_yml::Mapping;
use std::fs;
use std::path::Path;

pub const INSTALLATION_MANIFEST_FILE: &str = "config.json";

/// Install instructions shipped at the root of a bundle repository.
///
/// Every exclusion flag defaults to "include". The optional `docker-compose`
/// block is merged key by key over the generated compose entry of each
/// payload type and C2 profile installed from the same tree.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct InstallationManifest {
    #[serde(default)]
    pub exclude_payload_type: bool,
    #[serde(default)]
    pub exclude_c2_profiles: bool,
    #[serde(default)]
    pub exclude_documentation_payload: bool,
    #[serde(default)]
    pub exclude_documentation_c2: bool,
    #[serde(default)]
    pub exclude_documentation_wrapper: bool,
    #[serde(default, rename = "docker-compose")]
    pub docker_compose: Option<Mapping>,
}

impl InstallationManifest {
    /// Loads `config.json` from the root of a source tree.
    ///
    /// A missing or unparsable file is an error: no category decision can be
    /// made without it.
    pub fn load(source_root: &Path) -> Result<Self> {
        let path = source_root.join(INSTALLATION_MANIFEST_FILE);

        if !path.is_file() {
            bail!(
                "{} not found in {:?}",
                INSTALLATION_MANIFEST_FILE,
                source_root
            );
        }

        let content = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {:?}", path))
    }

    pub fn excludes(&self, category: BundleCategory) -> bool {
        match category {
            BundleCategory::PayloadType => self.exclude_payload_type,
            BundleCategory::C2Profile => self.exclude_c2_profiles,
        }
    }

    pub fn excludes_documentation(&self, category: DocCategory) -> bool {
        match category {
            DocCategory::Payload => self.exclude_documentation_payload,
            DocCategory::C2 => self.exclude_documentation_c2,
            DocCategory::Wrapper => self.exclude_documentation_wrapper,
        }
    }

    pub fn compose_overrides(&self) -> Mapping {
        self.docker_compose.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yml::Value;

    #[test]
    fn test_missing_flags_default_to_include() {
        let manifest: InstallationManifest = serde_json::from_str("{}").unwrap();

        for category in BundleCategory::ALL {
            assert!(!manifest.excludes(category));
        }
        for category in DocCategory::ALL {
            assert!(!manifest.excludes_documentation(category));
        }
        assert!(manifest.compose_overrides().is_empty());
    }

    #[test]
    fn test_parses_flags_and_overrides() {
        let json = r#"{
            "exclude_c2_profiles": true,
            "exclude_documentation_wrapper": true,
            "docker-compose": { "network_mode": "host", "environment": ["DEBUG=1"] }
        }"#;

        let manifest: InstallationManifest = serde_json::from_str(json).unwrap();

        assert!(manifest.excludes(BundleCategory::C2Profile));
        assert!(!manifest.excludes(BundleCategory::PayloadType));
        assert!(manifest.excludes_documentation(DocCategory::Wrapper));

        let overrides = manifest.compose_overrides();
        assert_eq!(
            overrides.get("network_mode"),
            Some(&Value::String("host".into()))
        );
    }

    #[test]
    fn test_load_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = InstallationManifest::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("config.json not found"));
    }

    #[test]
    fn test_load_fails_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INSTALLATION_MANIFEST_FILE), "{ not json").unwrap();

        assert!(InstallationManifest::load(dir.path()).is_err());
    }
}
