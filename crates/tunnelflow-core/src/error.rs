//! Tunnel orchestration error types

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised while provisioning or supervising a tunnel
///
/// Every variant is fatal for the run; nothing is retried.
#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("Credentials not found at {}: {reason}", path.display())]
    CredentialsNotFound { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("DNS API error: {0}")]
    Transport(String),

    #[error("{program} failed: {message}")]
    Subprocess { program: String, message: String },

    #[error("Tunnel daemon exited unexpectedly: {0}")]
    DaemonExited(ExitStatus),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TunnelError {
    pub fn subprocess(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subprocess {
            program: program.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TunnelError>;
