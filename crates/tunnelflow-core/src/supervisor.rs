//! Tunnel daemon supervision
//!
//! The daemon runs as a child process and the optional SOCKS5 relay as a
//! task; both share one [`CancellationToken`]. Shutdown sends SIGTERM to the
//! daemon, waits for the grace period and falls back to SIGKILL.

use crate::error::{Result, TunnelError};
use crate::relay;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::future::Future;
use std::net::SocketAddr;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time the daemon gets to exit after SIGTERM
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Lifecycle of the supervised daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Running,
    /// SIGTERM sent, waiting for exit
    Terminating,
    Stopped,
}

/// Handle to a started tunnel daemon
#[derive(Debug)]
pub struct RunningDaemon {
    child: Child,
    program: String,
    state: DaemonState,
    status: Option<ExitStatus>,
}

impl RunningDaemon {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Wait for the daemon to exit on its own
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.state = DaemonState::Stopped;
        self.status = Some(status);
        Ok(status)
    }

    /// Terminate the daemon: SIGTERM, wait up to `grace`, then SIGKILL
    pub async fn stop(&mut self, grace: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        self.state = DaemonState::Terminating;
        if let Some(pid) = self.child.id() {
            info!("Sending SIGTERM to {} (pid {})", self.program, pid);
            if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                debug!("Failed to send SIGTERM to {}: {}", pid, e);
            }
        }

        let status = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "Timeout reached after {:?}. Sending SIGKILL to {}",
                    grace, self.program
                );
                self.child.kill().await?;
                self.child.wait().await?
            }
        };

        info!("{} exited with {}", self.program, status);
        self.state = DaemonState::Stopped;
        self.status = Some(status);
        Ok(status)
    }
}

/// Owns the shared cancellation scope for the daemon and the relay
pub struct Supervisor {
    cancel: CancellationToken,
    grace: Duration,
    relay: Option<JoinHandle<()>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

impl Supervisor {
    pub fn new(grace: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            grace,
            relay: None,
        }
    }

    /// Token that stops everything this supervisor started
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn the daemon
    pub fn start(&self, mut command: Command) -> Result<RunningDaemon> {
        let program = command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned();

        command.kill_on_drop(true);
        let child = command.spawn().map_err(|e| {
            TunnelError::subprocess(&program, format!("failed to start: {}", e))
        })?;

        info!("{} started (pid {})", program, child.id().unwrap_or_default());
        Ok(RunningDaemon {
            child,
            program,
            state: DaemonState::Running,
            status: None,
        })
    }

    /// Start the SOCKS5 relay on `127.0.0.1:port`
    ///
    /// Port 0 picks a free port; the bound address is returned.
    pub async fn start_relay(&mut self, port: u16) -> Result<SocketAddr> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        info!("SOCKS5 proxy listening on {}", addr);

        let token = self.cancel.child_token();
        self.relay = Some(tokio::spawn(relay::serve(listener, token)));
        Ok(addr)
    }

    /// Block until `shutdown` resolves, the token is cancelled or the daemon
    /// exits, then tear everything down
    ///
    /// A daemon exiting on its own is reported as [`TunnelError::DaemonExited`].
    pub async fn run<F>(mut self, mut daemon: RunningDaemon, shutdown: F) -> Result<ExitStatus>
    where
        F: Future<Output = ()>,
    {
        let exited = tokio::select! {
            _ = shutdown => {
                info!("Shutdown signal received");
                None
            }
            _ = self.cancel.cancelled() => {
                info!("Supervisor cancelled");
                None
            }
            status = daemon.wait() => Some(status?),
        };

        self.cancel.cancel();

        let result = match exited {
            None => daemon.stop(self.grace).await,
            Some(status) => {
                warn!("{} exited on its own with {}", daemon.program, status);
                Err(TunnelError::DaemonExited(status))
            }
        };

        if let Some(relay) = self.relay.take() {
            if let Err(e) = relay.await {
                warn!("SOCKS5 relay task failed: {}", e);
            }
        }

        result
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
