//! Cloudflare provider error types

use thiserror::Error;
use tunnelflow_core::TunnelError;

#[derive(Error, Debug)]
pub enum CloudflareError {
    #[error("cloudflared not found ({0}). Please install cloudflared and make sure it is on PATH")]
    CloudflaredNotFound(String),

    #[error("cloudflared command failed: {0}")]
    CommandFailed(String),

    #[error("Cloudflare API error: {0}")]
    ApiError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CloudflareError>;

impl From<CloudflareError> for TunnelError {
    fn from(err: CloudflareError) -> Self {
        match err {
            e @ (CloudflareError::CloudflaredNotFound(_) | CloudflareError::CommandFailed(_)) => {
                TunnelError::subprocess("cloudflared", e.to_string())
            }
            CloudflareError::IoError(e) => TunnelError::Io(e),
            other => TunnelError::Transport(other.to_string()),
        }
    }
}
