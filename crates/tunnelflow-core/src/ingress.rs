//! cloudflared ingress configuration
//!
//! Generates the `<tunnel-id>-config.yml` file consumed by
//! `cloudflared --config <path> tunnel run`. Rules are matched top to bottom
//! by the daemon, so route order is preserved and the catch-all rule is
//! always last.

use crate::error::{Result, TunnelError};
use crate::model::{Protocol, Route};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Catch-all when at least one route is an HTTP service
pub const HTTP_FALLBACK: &str = "http_status:404";

/// Catch-all for pure TCP ingress
pub const TCP_FALLBACK: &str = "tcp://localhost:0";

/// Build the routes for a protocol selection
///
/// `proxy_domain` is required for [`Protocol::All`], where it fronts the
/// local SOCKS5 relay on `socks5_port`.
pub fn compute_routes(
    protocol: Protocol,
    domain: &str,
    port: u16,
    proxy_domain: Option<&str>,
    socks5_port: u16,
) -> Result<Vec<Route>> {
    if domain.trim().is_empty() {
        return Err(TunnelError::Config("domain must not be empty".to_string()));
    }

    let routes = match protocol {
        Protocol::Http => vec![Route::new(domain, format!("http://localhost:{}", port))],
        Protocol::Tcp => vec![Route::new(domain, format!("tcp://localhost:{}", port))],
        Protocol::All => {
            let proxy_domain = proxy_domain
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| {
                    TunnelError::Config("proxy-domain is required when protocol=all".to_string())
                })?;
            vec![
                Route::new(domain, format!("tcp://localhost:{}", port)),
                Route::new(proxy_domain, format!("tcp://localhost:{}", socks5_port)),
            ]
        }
    };

    Ok(routes)
}

/// Deterministic config path for a tunnel
pub fn config_path(dir: &Path, tunnel_id: &str) -> PathBuf {
    dir.join(format!("{}-config.yml", tunnel_id))
}

/// A single ingress rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
}

/// The cloudflared config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressConfig {
    pub tunnel: String,

    #[serde(rename = "credentials-file")]
    pub credentials_file: String,

    pub ingress: Vec<IngressRule>,
}

impl IngressConfig {
    pub fn new(tunnel_id: &str, credentials_path: &Path, routes: &[Route]) -> Result<Self> {
        if routes.is_empty() {
            return Err(TunnelError::Config(
                "at least one ingress route is required".to_string(),
            ));
        }

        let mut ingress: Vec<IngressRule> = routes
            .iter()
            .map(|r| IngressRule {
                hostname: Some(r.hostname.clone()),
                service: r.service.clone(),
            })
            .collect();

        ingress.push(IngressRule {
            hostname: None,
            service: fallback_service(routes).to_string(),
        });

        Ok(Self {
            tunnel: tunnel_id.to_string(),
            credentials_file: credentials_path.display().to_string(),
            ingress,
        })
    }

    /// The catch-all rule
    pub fn fallback(&self) -> Option<&IngressRule> {
        self.ingress.last()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write the config into `dir`, overwriting any previous file
    pub async fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = config_path(dir, &self.tunnel);
        let content = self.to_yaml()?;
        tokio::fs::write(&path, content).await?;

        tracing::info!("Config file written to {}", path.display());
        Ok(path)
    }
}

fn fallback_service(routes: &[Route]) -> &'static str {
    if routes.iter().any(Route::is_http) {
        HTTP_FALLBACK
    } else {
        TCP_FALLBACK
    }
}
