use super::DocCategory;
use std::path::PathBuf;

/// Concrete on-disk locations of a platform checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Working directory of the platform (holds the compose file)
    pub root: PathBuf,
    /// Installed services folder, relative to `root`
    pub installed_services: PathBuf,
    /// Local documentation content tree, relative to `root`
    pub documentation_content: PathBuf,
    /// UI icon folder, relative to `root`
    pub icons: PathBuf,
    /// Compose file name, relative to `root`
    pub compose_file: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            installed_services: PathBuf::from("InstalledServices"),
            documentation_content: PathBuf::from("documentation-docker/content"),
            icons: PathBuf::from("mythic-docker/src/static"),
            compose_file: PathBuf::from("docker-compose.yml"),
        }
    }

    pub fn installed_services_dir(&self) -> PathBuf {
        self.root.join(&self.installed_services)
    }

    pub fn service_dir(&self, name: &str) -> PathBuf {
        self.installed_services_dir().join(name)
    }

    /// Build context written into the compose entry, relative to the compose file
    pub fn build_context(&self, name: &str) -> String {
        format!(
            "./{}",
            self.installed_services.join(name).to_string_lossy()
        )
    }

    pub fn documentation_dir(&self, category: DocCategory, name: &str) -> PathBuf {
        self.root
            .join(&self.documentation_content)
            .join(category.content_dir())
            .join(name)
    }

    pub fn icon_path(&self, name: &str) -> PathBuf {
        self.root.join(&self.icons).join(format!("{name}.svg"))
    }

    pub fn compose_path(&self) -> PathBuf {
        self.root.join(&self.compose_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_paths() {
        let layout = Layout::new("/opt/mythic");

        assert_eq!(
            layout.service_dir("apollo"),
            PathBuf::from("/opt/mythic/InstalledServices/apollo")
        );
        assert_eq!(layout.build_context("apollo"), "./InstalledServices/apollo");
        assert_eq!(
            layout.documentation_dir(DocCategory::C2, "http"),
            PathBuf::from("/opt/mythic/documentation-docker/content/C2 Profiles/http")
        );
        assert_eq!(
            layout.icon_path("apollo"),
            PathBuf::from("/opt/mythic/mythic-docker/src/static/apollo.svg")
        );
        assert_eq!(
            layout.compose_path(),
            PathBuf::from("/opt/mythic/docker-compose.yml")
        );
    }
}
