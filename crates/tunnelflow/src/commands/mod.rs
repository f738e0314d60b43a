pub mod resume;
pub mod up;

use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tunnelflow_cloudflare::Cloudflared;
use tunnelflow_core::{Protocol, Supervisor, TunnelCli, shutdown_signal};

/// 両コマンド共通の設定
pub struct Session {
    pub credentials: PathBuf,
    pub cloudflared: PathBuf,
    pub config_dir: PathBuf,
    pub protocol: Protocol,
    pub socks5_port: u16,
    pub shutdown_timeout: Duration,
    pub logout: bool,
}

impl Session {
    pub fn cli(&self) -> Cloudflared {
        Cloudflared::new(&self.cloudflared)
    }
}

/// cloudflared（と必要なら SOCKS5 リレー）を起動し、シグナルを受けるまで待つ
pub async fn supervise(session: &Session, cli: &Cloudflared, config_path: &Path) -> anyhow::Result<()> {
    let mut supervisor = Supervisor::new(session.shutdown_timeout);

    if session.protocol == Protocol::All {
        supervisor
            .start_relay(session.socks5_port)
            .await
            .with_context(|| format!("failed to start SOCKS5 proxy on port {}", session.socks5_port))?;
    }

    let daemon = supervisor
        .start(cli.run_command(config_path))
        .context("failed to start Cloudflare Tunnel")?;

    println!("{}", "✓ Cloudflare Tunnel を起動しました (Ctrl+C で停止)".green());

    let result = supervisor.run(daemon, shutdown_signal()).await;

    if session.logout {
        if let Err(e) = cli.logout().await {
            tracing::warn!("Logout failed: {}", e);
        }
    }

    result.context("Cloudflare Tunnel stopped unexpectedly")?;
    println!("{}", "Cloudflare Tunnel を停止しました".cyan());
    Ok(())
}
