//! cloudflared CLI wrapper
//!
//! Wraps the `cloudflared tunnel` subcommands. Login and creation inherit the
//! terminal since they may need operator interaction (browser login URL).

use crate::error::{CloudflareError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tunnelflow_core::TunnelCli;

pub const DEFAULT_BINARY: &str = "cloudflared";

/// cloudflared CLI wrapper
#[derive(Debug, Clone)]
pub struct Cloudflared {
    binary: PathBuf,
}

impl Default for Cloudflared {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl Cloudflared {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }

    /// Run a cloudflared command to completion with inherited stdio
    async fn run_interactive(&self, mut cmd: Command) -> Result<()> {
        tracing::debug!("Running: {:?}", cmd.as_std());

        let status = cmd.status().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CloudflareError::CloudflaredNotFound(self.binary.display().to_string())
            } else {
                CloudflareError::IoError(e)
            }
        })?;

        if !status.success() {
            return Err(CloudflareError::CommandFailed(format!(
                "{:?} exited with {}",
                cmd.as_std(),
                status
            )));
        }

        Ok(())
    }

    /// Arguments for `tunnel create`
    pub fn create_args(name: &str, credentials_path: &Path) -> Vec<String> {
        vec![
            "tunnel".to_string(),
            "--credentials-file".to_string(),
            credentials_path.display().to_string(),
            "create".to_string(),
            name.to_string(),
        ]
    }

    /// Arguments for `tunnel run`
    pub fn run_args(config_path: &Path) -> Vec<String> {
        vec![
            "--config".to_string(),
            config_path.display().to_string(),
            "tunnel".to_string(),
            "run".to_string(),
        ]
    }
}

#[async_trait]
impl TunnelCli for Cloudflared {
    async fn login(&self) -> tunnelflow_core::Result<()> {
        tracing::info!("Authenticating with Cloudflare...");
        self.run_interactive(self.command(["tunnel", "login"]))
            .await?;
        tracing::info!("Cloudflare authentication successful");
        Ok(())
    }

    async fn create_tunnel(&self, name: &str, credentials_path: &Path) -> tunnelflow_core::Result<()> {
        tracing::info!("Creating tunnel {}...", name);
        self.run_interactive(self.command(Self::create_args(name, credentials_path)))
            .await?;
        Ok(())
    }

    fn run_command(&self, config_path: &Path) -> Command {
        self.command(Self::run_args(config_path))
    }

    async fn logout(&self) -> tunnelflow_core::Result<()> {
        tracing::info!("Logging out of Cloudflare...");
        self.run_interactive(self.command(["tunnel", "logout"]))
            .await?;
        tracing::info!("Successfully logged out");
        Ok(())
    }
}
