//! Orchestration steps
//!
//! Each step takes its collaborators explicitly and returns a result; the
//! binary chains them as resolve identity → reconcile DNS → write config →
//! supervise.

use crate::error::{Result, TunnelError};
use crate::model::{Route, TunnelIdentity, cname_target};
use crate::provider::{DnsProvider, TunnelCli};
use crate::store::CredentialStore;

/// Result of reconciling a single hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A record with this name was already present; it was left untouched
    Existing,
    /// A CNAME to the tunnel was created
    Created,
}

/// Load the cached tunnel identity or provision a new tunnel
///
/// An existing, parseable credential file is reused as-is. Otherwise the CLI
/// logs in, creates `tunnel_name`, and the identity is read back from the
/// credential file the CLI wrote.
pub async fn resolve_identity(
    store: &CredentialStore,
    cli: &dyn TunnelCli,
    tunnel_name: Option<&str>,
) -> Result<TunnelIdentity> {
    match store.load().await {
        Ok(identity) => {
            tracing::info!(
                "Reusing tunnel {} from {}",
                identity.tunnel_id,
                store.path().display()
            );
            return Ok(identity);
        }
        Err(TunnelError::CredentialsNotFound { reason, .. }) => {
            tracing::info!("No usable credentials ({}), provisioning a new tunnel", reason);
        }
        Err(e) => return Err(e),
    }

    let name = tunnel_name.filter(|n| !n.trim().is_empty()).ok_or_else(|| {
        TunnelError::Config("tunnel name is required to create a new tunnel".to_string())
    })?;

    cli.login().await?;
    cli.create_tunnel(name, store.path()).await?;

    let identity = store.load().await?;
    store.save(&identity).await?;

    tracing::info!("Tunnel {} created ({})", name, identity.tunnel_id);
    Ok(identity)
}

/// Make sure `hostname` resolves to the tunnel
///
/// Never updates or deletes an existing record, even one pointing elsewhere.
pub async fn ensure_tunnel_record(
    dns: &dyn DnsProvider,
    hostname: &str,
    tunnel_id: &str,
) -> Result<EnsureOutcome> {
    if dns.record_exists(hostname).await? {
        tracing::info!("DNS record for {} already exists, skipping", hostname);
        return Ok(EnsureOutcome::Existing);
    }

    let target = cname_target(tunnel_id);
    dns.create_cname(hostname, &target).await?;
    tracing::info!("Created DNS record {} -> {}", hostname, target);
    Ok(EnsureOutcome::Created)
}

/// Ensure a record for every route hostname, in route order
pub async fn reconcile_dns(
    dns: &dyn DnsProvider,
    routes: &[Route],
    tunnel_id: &str,
) -> Result<Vec<(String, EnsureOutcome)>> {
    let mut outcomes = Vec::with_capacity(routes.len());
    for route in routes {
        if outcomes.iter().any(|(h, _)| h == &route.hostname) {
            continue;
        }
        let outcome = ensure_tunnel_record(dns, &route.hostname, tunnel_id).await?;
        outcomes.push((route.hostname.clone(), outcome));
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DnsRecord;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use tokio::process::Command;

    #[derive(Default)]
    struct FakeDns {
        records: Mutex<HashSet<String>>,
        lookups: AtomicUsize,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl DnsProvider for FakeDns {
        async fn record_exists(&self, hostname: &str) -> Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.lock().unwrap().contains(hostname))
        }

        async fn create_cname(&self, hostname: &str, target: &str) -> Result<DnsRecord> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.records.lock().unwrap().insert(hostname.to_string());
            Ok(DnsRecord {
                id: format!("rec-{}", hostname),
                record_type: "CNAME".to_string(),
                name: hostname.to_string(),
                content: target.to_string(),
            })
        }
    }

    struct FailingDns;

    #[async_trait]
    impl DnsProvider for FailingDns {
        async fn record_exists(&self, _hostname: &str) -> Result<bool> {
            Err(TunnelError::Transport("403 Forbidden".to_string()))
        }

        async fn create_cname(&self, _hostname: &str, _target: &str) -> Result<DnsRecord> {
            panic!("create must not be reached after a failed lookup");
        }
    }

    /// Simulates cloudflared writing the credential file on create
    #[derive(Default)]
    struct FakeCli {
        logins: AtomicUsize,
        creates: AtomicUsize,
        created_at: Mutex<Option<PathBuf>>,
        write_garbage: bool,
    }

    #[async_trait]
    impl TunnelCli for FakeCli {
        async fn login(&self) -> Result<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn create_tunnel(&self, _name: &str, credentials_path: &Path) -> Result<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let content = if self.write_garbage {
                "{".to_string()
            } else {
                r#"{"AccountTag":"acct","TunnelSecret":"c2VjcmV0","TunnelID":"new-tunnel"}"#
                    .to_string()
            };
            std::fs::write(credentials_path, content)?;
            *self.created_at.lock().unwrap() = Some(credentials_path.to_path_buf());
            Ok(())
        }

        fn run_command(&self, _config_path: &Path) -> Command {
            Command::new("true")
        }

        async fn logout(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ensure_record_is_idempotent() {
        let dns = FakeDns::default();

        let first = ensure_tunnel_record(&dns, "app.test", "abc123").await.unwrap();
        let second = ensure_tunnel_record(&dns, "app.test", "abc123").await.unwrap();

        assert_eq!(first, EnsureOutcome::Created);
        assert_eq!(second, EnsureOutcome::Existing);
        assert_eq!(dns.creates.load(Ordering::SeqCst), 1);
        assert_eq!(dns.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ensure_record_propagates_transport_errors() {
        let err = ensure_tunnel_record(&FailingDns, "app.test", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, TunnelError::Transport(_)));
    }

    #[tokio::test]
    async fn test_reconcile_dns_skips_duplicate_hostnames() {
        let dns = FakeDns::default();
        dns.records.lock().unwrap().insert("proxy.test".to_string());
        let routes = vec![
            Route::new("app.test", "tcp://localhost:22"),
            Route::new("app.test", "tcp://localhost:23"),
            Route::new("proxy.test", "tcp://localhost:1080"),
        ];

        let outcomes = reconcile_dns(&dns, &routes, "abc123").await.unwrap();
        assert_eq!(
            outcomes,
            vec![
                ("app.test".to_string(), EnsureOutcome::Created),
                ("proxy.test".to_string(), EnsureOutcome::Existing),
            ]
        );
        assert_eq!(dns.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_credentials_are_reused() {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("credentials.json"));
        store
            .save(&TunnelIdentity {
                account_tag: "acct".to_string(),
                tunnel_secret: "c2VjcmV0".to_string(),
                tunnel_id: "cached".to_string(),
            })
            .await
            .unwrap();
        let cli = FakeCli::default();

        let identity = resolve_identity(&store, &cli, Some("ignored")).await.unwrap();

        assert_eq!(identity.tunnel_id, "cached");
        assert_eq!(cli.logins.load(Ordering::SeqCst), 0);
        assert_eq!(cli.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_provision_and_read_back() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("credentials.json");
        let store = CredentialStore::new(&path);
        let cli = FakeCli::default();

        let identity = resolve_identity(&store, &cli, Some("dev")).await.unwrap();

        assert_eq!(identity.tunnel_id, "new-tunnel");
        assert_eq!(cli.logins.load(Ordering::SeqCst), 1);
        assert_eq!(cli.creates.load(Ordering::SeqCst), 1);
        assert_eq!(cli.created_at.lock().unwrap().as_deref(), Some(path.as_path()));
        assert_eq!(store.load().await.unwrap(), identity);
    }

    #[tokio::test]
    async fn test_unreadable_created_credentials_fail() {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("credentials.json"));
        let cli = FakeCli {
            write_garbage: true,
            ..Default::default()
        };

        let err = resolve_identity(&store, &cli, Some("dev")).await.unwrap_err();
        assert!(matches!(err, TunnelError::CredentialsNotFound { .. }));
    }

    #[tokio::test]
    async fn test_provisioning_requires_tunnel_name() {
        let temp_dir = tempdir().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("credentials.json"));
        let cli = FakeCli::default();

        let err = resolve_identity(&store, &cli, None).await.unwrap_err();
        assert!(matches!(err, TunnelError::Config(_)));
        assert_eq!(cli.logins.load(Ordering::SeqCst), 0);
    }
}
