use crate::cli::AppContext;
use crate::domain::{BundleOutcome, InstallReport, UninstallReport};
use crate::infra::TerminalPrompt;
use crate::services::InstallOptions;
use anyhow::{Result, bail};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct InstallArgs {
    /// Git URL of the bundle repository
    pub url: String,
    /// Branch to install instead of the default one
    #[arg(short, long)]
    pub branch: Option<String>,
    /// Replace installed bundles without asking
    #[arg(short = 'f', long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct InstallByNameArgs {
    /// Short name looked up in the agent and C2 profile organizations
    pub name: String,
}

#[derive(Args)]
pub struct InstallFolderArgs {
    /// Local folder laid out like a bundle repository
    pub path: PathBuf,
    #[arg(short = 'f', long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct UninstallArgs {
    /// Installed services to remove
    #[arg(required = true)]
    pub names: Vec<String>,
}

pub fn install(args: InstallArgs, ctx: &AppContext) -> Result<()> {
    let prompt = TerminalPrompt;
    let report = ctx.orchestrator.install_from_url(
        &args.url,
        args.branch.as_deref(),
        &InstallOptions::new(args.overwrite, &prompt),
    )?;
    print_lines(&install_summary(&report));
    Ok(())
}

pub fn install_by_name(args: InstallByNameArgs, ctx: &AppContext) -> Result<()> {
    let report = ctx.orchestrator.install_by_name(&args.name)?;
    print_lines(&install_summary(&report));
    Ok(())
}

pub fn install_folder(args: InstallFolderArgs, ctx: &AppContext) -> Result<()> {
    let prompt = TerminalPrompt;
    let report = ctx
        .orchestrator
        .install_folder(&args.path, &InstallOptions::new(args.overwrite, &prompt))?;
    print_lines(&install_summary(&report));
    Ok(())
}

pub fn uninstall(args: UninstallArgs, ctx: &AppContext) -> Result<()> {
    let report = ctx.orchestrator.uninstall(&args.names)?;
    print_lines(&uninstall_summary(&report));
    ensure_all_found(&report)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

/// One line per bundle, then the restart notice
pub fn install_summary(report: &InstallReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .results
        .iter()
        .map(|r| match &r.outcome {
            BundleOutcome::Installed => format!("✅ {} {}: installed", r.category, r.name),
            BundleOutcome::Skipped(why) => format!("⏭️  {} {}: skipped ({why})", r.category, r.name),
            BundleOutcome::Failed(why) => format!("❌ {} {}: failed ({why})", r.category, r.name),
        })
        .collect();

    if report.results.is_empty() {
        lines.push("⚠️  Nothing was installed".to_string());
    }
    if report.documentation_restarted {
        lines.push("🔄 Documentation service restarted".to_string());
    }
    lines
}

pub fn uninstall_summary(report: &UninstallReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .removed()
        .into_iter()
        .map(|name| format!("🗑️  {name}: removed"))
        .collect();
    lines.extend(
        report
            .not_found()
            .into_iter()
            .map(|name| format!("⚠️  {name}: not installed")),
    );
    if report.documentation_restarted {
        lines.push("🔄 Documentation service restarted".to_string());
    }
    lines
}

/// Unknown names make the whole command fail once everything else is done
pub fn ensure_all_found(report: &UninstallReport) -> Result<()> {
    let missing = report.not_found();
    if !missing.is_empty() {
        bail!("no installed service named {}", missing.join(", "));
    }
    Ok(())
}
