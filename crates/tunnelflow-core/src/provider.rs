//! Provider trait definitions
//!
//! The orchestration steps only talk to the outside world through these two
//! traits, so tests can swap in fakes for the DNS API and the tunnel CLI.

use crate::error::Result;
use crate::model::DnsRecord;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Zone-scoped DNS record management
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Whether any record with exactly this name exists in the zone
    async fn record_exists(&self, hostname: &str) -> Result<bool>;

    /// Create a CNAME record `hostname -> target`
    async fn create_cname(&self, hostname: &str, target: &str) -> Result<DnsRecord>;
}

/// The external tunnel CLI (`cloudflared`)
#[async_trait]
pub trait TunnelCli: Send + Sync {
    /// Interactive account login; blocks until the login flow exits
    async fn login(&self) -> Result<()>;

    /// Create a named tunnel
    ///
    /// The CLI is expected to write the tunnel identity to
    /// `credentials_path`; the caller reads it back from there.
    async fn create_tunnel(&self, name: &str, credentials_path: &Path) -> Result<()>;

    /// Command that runs the tunnel daemon with a generated config
    fn run_command(&self, config_path: &Path) -> Command;

    /// Drop the account login; failures are not fatal
    async fn logout(&self) -> Result<()>;
}
