use crate::cli::AppContext;
use crate::domain::{ContainerHealthStatus, ServiceManager};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde_yml::Value;

#[derive(Args)]
pub struct ServicesCommand {
    #[command(subcommand)]
    pub action: ServicesAction,
}

#[derive(Subcommand)]
pub enum ServicesAction {
    /// Installed bundles, from the manifest and from disk
    List,
    /// Show the last log lines of a service
    Logs {
        name: String,
        #[arg(short = 'n', long, default_value_t = 200)]
        lines: usize,
    },
    /// Health of the given services, or of every manifest entry
    Health { names: Vec<String> },
    /// Container state and published ports of every manifest entry
    Status,
    /// Report ports already taken by something other than the platform
    TestPorts,
    /// Manage volumes declared in the manifest
    Volumes {
        #[command(subcommand)]
        action: VolumeAction,
    },
}

#[derive(Subcommand)]
pub enum VolumeAction {
    List,
    Remove { name: String },
}

pub fn run(command: ServicesCommand, ctx: &AppContext) -> Result<()> {
    let manager = ctx.manager().as_ref();

    match command.action {
        ServicesAction::List => list(manager),
        ServicesAction::Logs { name, lines } => {
            print!("{}", manager.get_logs(&name, lines)?);
            Ok(())
        }
        ServicesAction::Health { names } => health(manager, names),
        ServicesAction::Status => status(manager),
        ServicesAction::TestPorts => test_ports(manager),
        ServicesAction::Volumes { action } => volumes(manager, action),
    }
}

fn list(manager: &dyn ServiceManager) -> Result<()> {
    println!("📦 Installed services:");
    for line in installed_lines(manager)? {
        println!("  {line}");
    }
    Ok(())
}

/// Folders on disk first, flagged when unregistered, then manifest entries
/// whose folder is gone
fn installed_lines(manager: &dyn ServiceManager) -> Result<Vec<String>> {
    let registered = manager.non_core_service_names()?;
    let on_disk = manager.installed_services_on_disk()?;

    let mut lines: Vec<String> = on_disk
        .iter()
        .map(|name| {
            let marker = if registered.contains(name) { "" } else { " (not in manifest)" };
            format!("{name}{marker}")
        })
        .collect();
    lines.extend(
        registered
            .iter()
            .filter(|n| !on_disk.contains(n))
            .map(|name| format!("{name} (missing on disk)")),
    );
    Ok(lines)
}

fn health(manager: &dyn ServiceManager, names: Vec<String>) -> Result<()> {
    let names = if names.is_empty() {
        manager.list_service_names()?
    } else {
        names
    };

    for (name, status) in manager.health_check(&names)? {
        let icon = match status {
            ContainerHealthStatus::Healthy => "✅",
            ContainerHealthStatus::Unhealthy => "❌",
            ContainerHealthStatus::Starting => "⏳",
            ContainerHealthStatus::Unknown | ContainerHealthStatus::NotApplicable => "❔",
        };
        println!("{icon} {name}: {status:?}");
    }
    Ok(())
}

fn status(manager: &dyn ServiceManager) -> Result<()> {
    let ports = manager.connection_info()?;

    for (name, state) in manager.status()? {
        let published = ports
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| p.join(", "))
            .unwrap_or_default();
        println!("{name:<32} {state:<12} {published}");
    }
    Ok(())
}

fn test_ports(manager: &dyn ServiceManager) -> Result<()> {
    let conflicts = manager.test_ports()?;
    if conflicts.is_empty() {
        println!("✅ No port conflicts");
        return Ok(());
    }

    for (name, port) in &conflicts {
        println!("❌ {name}: port {port} is already in use");
    }
    bail!("{} port conflict(s) found", conflicts.len())
}

fn volumes(manager: &dyn ServiceManager, action: VolumeAction) -> Result<()> {
    match action {
        VolumeAction::List => {
            for (name, config) in manager.get_volumes()? {
                let Value::String(name) = name else { continue };
                let detail = serde_yml::to_string(&config)?;
                println!("{name}: {}", detail.trim());
            }
            Ok(())
        }
        VolumeAction::Remove { name } => {
            manager.remove_volume(&name)?;
            println!("🗑️  Volume {name} removed from the manifest");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContainerState;
    use crate::test_support::MockServiceManager;

    #[test]
    fn test_health_defaults_to_every_manifest_entry() {
        let mock = MockServiceManager::new();
        mock.add_manifest_entry("apollo");
        mock.add_service("apollo", ContainerState::Running);
        mock.set_health_status("apollo", ContainerHealthStatus::Healthy);

        assert!(health(&mock, Vec::new()).is_ok());
    }

    #[test]
    fn test_volume_remove_goes_through_manager() {
        let mock = MockServiceManager::new();

        volumes(&mock, VolumeAction::Remove { name: "old_volume".into() }).unwrap();

        assert_eq!(mock.get_commands(), vec!["remove_volume:old_volume"]);
    }

    #[test]
    fn test_no_port_conflicts_is_ok() {
        let mock = MockServiceManager::new();

        assert!(test_ports(&mock).is_ok());
    }

    #[test]
    fn test_list_flags_manifest_and_disk_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apollo")).unwrap();
        std::fs::create_dir_all(dir.path().join("orphan")).unwrap();
        let mock = MockServiceManager::new().with_installed_dir(dir.path());
        mock.add_manifest_entry("apollo");
        mock.add_manifest_entry("ghost");
        mock.add_manifest_entry("mythic_server");

        let mut lines = installed_lines(&mock).unwrap();
        lines.sort();

        assert_eq!(
            lines,
            vec!["apollo", "ghost (missing on disk)", "orphan (not in manifest)"]
        );
    }
}
