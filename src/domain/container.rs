#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    NotCreated,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::NotCreated => "not created",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerHealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    Unknown,
    NotApplicable, // No healthcheck configured
}

impl ContainerHealthStatus {
    /// Parses the `.State.Health.Status` field reported by the engine
    pub fn from_engine(raw: &str) -> Self {
        match raw.trim() {
            "healthy" => Self::Healthy,
            "unhealthy" => Self::Unhealthy,
            "starting" => Self::Starting,
            "" | "<no value>" | "none" => Self::NotApplicable,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_running_counts_as_running() {
        assert!(ContainerState::Running.is_running());
        assert!(!ContainerState::Stopped.is_running());
        assert!(!ContainerState::NotCreated.is_running());
    }

    #[test]
    fn test_health_status_parsing() {
        assert_eq!(
            ContainerHealthStatus::from_engine("healthy\n"),
            ContainerHealthStatus::Healthy
        );
        assert_eq!(
            ContainerHealthStatus::from_engine("<no value>"),
            ContainerHealthStatus::NotApplicable
        );
        assert_eq!(
            ContainerHealthStatus::from_engine("weird"),
            ContainerHealthStatus::Unknown
        );
    }
}
