//! Local file stores
//!
//! The credential file written by `cloudflared tunnel create` and the API key
//! file provided by the operator are the only durable inputs of a run.

use crate::error::{Result, TunnelError};
use crate::model::{ApiKeys, TunnelIdentity};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Reads and writes the tunnel credential file
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the tunnel identity
    ///
    /// A missing, unreadable or malformed file all count as "not found".
    pub async fn load(&self) -> Result<TunnelIdentity> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.not_found(e.to_string()))?;

        let identity: TunnelIdentity =
            serde_json::from_str(&content).map_err(|e| self.not_found(e.to_string()))?;

        if identity.tunnel_id.trim().is_empty() {
            return Err(self.not_found("TunnelID is empty"));
        }

        tracing::debug!("Loaded credentials for tunnel {}", identity.tunnel_id);
        Ok(identity)
    }

    /// Save the tunnel identity with owner-only permissions
    pub async fn save(&self, identity: &TunnelIdentity) -> Result<()> {
        let content = serde_json::to_string_pretty(identity)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        // mode() only applies on creation; a stale tmp file keeps its bits
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp, &self.path).await?;

        tracing::debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }

    fn not_found(&self, reason: impl Into<String>) -> TunnelError {
        TunnelError::CredentialsNotFound {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

/// Reads the Cloudflare API key file
#[derive(Debug, Clone)]
pub struct ApiKeyStore {
    path: PathBuf,
}

impl ApiKeyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub async fn load(&self) -> Result<ApiKeys> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            TunnelError::Config(format!(
                "failed to read API keys file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let keys: ApiKeys = serde_json::from_str(&content).map_err(|e| {
            TunnelError::Config(format!(
                "failed to parse API keys file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        if keys.api_token.trim().is_empty() || keys.zone_id.trim().is_empty() {
            return Err(TunnelError::Config(format!(
                "ApiToken or ZoneId missing in {}",
                self.path.display()
            )));
        }

        Ok(keys)
    }
}
