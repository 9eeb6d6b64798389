use crate::cli::AppContext;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub action: SyncAction,
}

#[derive(Subcommand)]
pub enum SyncAction {
    /// Install the sync service from a Git repository
    Install {
        url: String,
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Install the sync service from a local folder
    InstallFolder { path: PathBuf },
    /// Stop and remove the sync service
    Uninstall,
}

pub fn run(command: SyncCommand, ctx: &AppContext) -> Result<()> {
    let sync_name = &ctx.config.services.sync;

    match command.action {
        SyncAction::Install { url, branch } => {
            ctx.orchestrator.sync_install(&url, branch.as_deref())?;
            println!("✅ {sync_name} installed");
        }
        SyncAction::InstallFolder { path } => {
            ctx.orchestrator.sync_install_folder(&path)?;
            println!("✅ {sync_name} installed");
        }
        SyncAction::Uninstall => {
            ctx.orchestrator.sync_uninstall()?;
            println!("🗑️  {sync_name} removed");
        }
    }

    Ok(())
}
