/// What happened to a single bundle during a best-effort install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    Installed,
    Skipped(String),
    Failed(String),
}

impl BundleOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleResult {
    pub category: &'static str,
    pub name: String,
    pub outcome: BundleOutcome,
}

/// Per-bundle outcomes of one install run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub results: Vec<BundleResult>,
    /// Categories skipped because they were excluded or absent from the tree
    pub skipped_categories: Vec<&'static str>,
    pub documentation_restarted: bool,
}

impl InstallReport {
    pub fn record(&mut self, category: &'static str, name: &str, outcome: BundleOutcome) {
        self.results.push(BundleResult {
            category,
            name: name.to_string(),
            outcome,
        });
    }

    pub fn outcome_of(&self, category: &str, name: &str) -> Option<&BundleOutcome> {
        self.results
            .iter()
            .find(|r| r.category == category && r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn installed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_installed())
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn skipped(&self) -> Vec<&BundleResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, BundleOutcome::Skipped(_)))
            .collect()
    }

    pub fn failed(&self) -> Vec<&BundleResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, BundleOutcome::Failed(_)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub results: Vec<(String, UninstallOutcome)>,
    pub documentation_restarted: bool,
}

impl UninstallReport {
    pub fn removed(&self) -> Vec<&str> {
        self.names_with(UninstallOutcome::Removed)
    }

    pub fn not_found(&self) -> Vec<&str> {
        self.names_with(UninstallOutcome::NotFound)
    }

    fn names_with(&self, outcome: UninstallOutcome) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, o)| *o == outcome)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_groups_outcomes() {
        let mut report = InstallReport::default();
        report.record("Payload Type", "apollo", BundleOutcome::Installed);
        report.record(
            "Payload Type",
            "poseidon",
            BundleOutcome::Skipped("overwrite declined".into()),
        );
        report.record(
            "C2 Profile",
            "http",
            BundleOutcome::Failed("copy failed".into()),
        );

        assert_eq!(report.installed(), vec!["apollo"]);
        assert_eq!(report.skipped().len(), 1);
        assert_eq!(report.failed()[0].name, "http");
        assert_eq!(
            report.outcome_of("Payload Type", "apollo"),
            Some(&BundleOutcome::Installed)
        );
        assert_eq!(report.outcome_of("C2 Profile", "apollo"), None);
    }

    #[test]
    fn test_uninstall_report_splits_names() {
        let report = UninstallReport {
            results: vec![
                ("apollo".into(), UninstallOutcome::Removed),
                ("ghost".into(), UninstallOutcome::NotFound),
            ],
            documentation_restarted: false,
        };

        assert_eq!(report.removed(), vec!["apollo"]);
        assert_eq!(report.not_found(), vec!["ghost"]);
    }
}
