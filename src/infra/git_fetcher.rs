use crate::domain::SourceFetcher;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Fetches bundle repositories with the `git` binary
#[derive(Debug, Default)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl SourceFetcher for GitFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, destination: &Path) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args([
            "-c",
            "http.sslVerify=false",
            "clone",
            "--recurse-submodules",
            "--single-branch",
        ]);

        match branch {
            Some(branch) => {
                info!("Cloning branch \"{branch}\" from {url}");
                cmd.args(["--branch", branch]);
            }
            None => info!("Cloning {url}"),
        }

        cmd.arg(url).arg(destination);

        let status = cmd
            .status()
            .with_context(|| format!("running git clone for {url}"))?;

        if !status.success() {
            bail!("git clone returned status {:?} ({url})", status);
        }

        Ok(())
    }

    fn remote_exists(&self, url: &str) -> bool {
        debug!("Probing {url}");
        Command::new("git")
            .args(["ls-remote", url, "HEAD"])
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}
