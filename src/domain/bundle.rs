use std::path::{Path, PathBuf};

/// Categories of bundles that run as their own service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleCategory {
    PayloadType,
    C2Profile,
}

impl BundleCategory {
    /// Processing order used by the install planner
    pub const ALL: [BundleCategory; 2] = [Self::PayloadType, Self::C2Profile];

    /// Folder holding this category inside a fetched source tree
    pub fn source_dir(&self) -> &'static str {
        match self {
            Self::PayloadType => "Payload_Type",
            Self::C2Profile => "C2_Profiles",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PayloadType => "Payload Type",
            Self::C2Profile => "C2 Profile",
        }
    }

    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::PayloadType => ServiceKind::PayloadBundle,
            Self::C2Profile => ServiceKind::ProfileBundle,
        }
    }
}

/// Documentation sets shipped next to bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Payload,
    C2,
    Wrapper,
}

impl DocCategory {
    pub const ALL: [DocCategory; 3] = [Self::Payload, Self::C2, Self::Wrapper];

    pub fn source_dir(&self) -> &'static str {
        match self {
            Self::Payload => "documentation-payload",
            Self::C2 => "documentation-c2",
            Self::Wrapper => "documentation-wrapper",
        }
    }

    /// Folder under the documentation content tree (local or in the volume)
    pub fn content_dir(&self) -> &'static str {
        match self {
            Self::Payload => "Agents",
            Self::C2 => "C2 Profiles",
            Self::Wrapper => "Wrappers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Payload => "Payload documentation",
            Self::C2 => "C2 documentation",
            Self::Wrapper => "Wrapper documentation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    PayloadBundle,
    ProfileBundle,
    SyncService,
    DocumentationOnly,
}

/// A named bundle living under the installed services folder.
///
/// Running state and manifest presence are never stored here; they are
/// queried from the service manager whenever a decision depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub name: String,
    pub kind: ServiceKind,
    pub path: PathBuf,
}

impl ServiceUnit {
    pub fn new(name: impl Into<String>, kind: ServiceKind, installed_services: &Path) -> Self {
        let name = name.into();
        let path = installed_services.join(&name);
        Self { name, kind, path }
    }

    /// Documentation set of a bundle, living in the documentation content tree
    pub fn documentation(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            kind: ServiceKind::DocumentationOnly,
            path,
        }
    }

    /// Whether anything occupies the unit's path
    pub fn is_on_disk(&self) -> bool {
        self.path.exists()
    }
}
