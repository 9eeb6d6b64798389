use anyhow::Result;
use clap::{Parser, Subcommand};
use mythic_ctl::cli::{
    self, AppContext, InstallArgs, InstallByNameArgs, InstallFolderArgs, ServicesCommand,
    SyncCommand, UninstallArgs,
};
use mythic_ctl::infra::config::default_config_dir;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mythic-ctl",
    version,
    about = "Installs, updates and removes platform extension bundles"
)]
struct Cli {
    /// Configuration directory (default: ~/.config/mythic-ctl)
    #[arg(long, env = "MYTHIC_CTL_CONFIG_DIR", default_value_os_t = default_config_dir())]
    config_dir: std::path::PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install payload types, C2 profiles and documentation from a Git repository
    Install(InstallArgs),
    /// Install a bundle from the well-known organizations by its short name
    InstallByName(InstallByNameArgs),
    /// Install from a local folder laid out like a bundle repository
    InstallFolder(InstallFolderArgs),
    /// Remove installed services and their documentation
    Uninstall(UninstallArgs),
    /// Manage the sync service
    Sync(SyncCommand),
    /// Inspect and manage services in the manifest
    Services(ServicesCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load(&cli.config_dir)?;

    match cli.command {
        Commands::Install(args) => cli::install::install(args, &ctx),
        Commands::InstallByName(args) => cli::install::install_by_name(args, &ctx),
        Commands::InstallFolder(args) => cli::install::install_folder(args, &ctx),
        Commands::Uninstall(args) => cli::install::uninstall(args, &ctx),
        Commands::Sync(cmd) => cli::sync::run(cmd, &ctx),
        Commands::Services(cmd) => cli::services::run(cmd, &ctx),
    }
}
