//! Tunnel data model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix Cloudflare uses for tunnel CNAME targets
pub const TUNNEL_CNAME_SUFFIX: &str = "cfargotunnel.com";

/// Identity of a named tunnel, as written by `cloudflared tunnel create`
///
/// Field order here is the on-disk order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelIdentity {
    #[serde(rename = "AccountTag")]
    pub account_tag: String,

    #[serde(rename = "TunnelSecret")]
    pub tunnel_secret: String,

    #[serde(rename = "TunnelID")]
    pub tunnel_id: String,
}

impl TunnelIdentity {
    /// CNAME target for DNS records bound to this tunnel
    pub fn cname_target(&self) -> String {
        cname_target(&self.tunnel_id)
    }
}

// The secret must never end up in logs.
impl fmt::Debug for TunnelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelIdentity")
            .field("account_tag", &self.account_tag)
            .field("tunnel_secret", &"<redacted>")
            .field("tunnel_id", &self.tunnel_id)
            .finish()
    }
}

pub fn cname_target(tunnel_id: &str) -> String {
    format!("{}.{}", tunnel_id, TUNNEL_CNAME_SUFFIX)
}

/// Cloudflare API credentials
#[derive(Clone, Deserialize)]
pub struct ApiKeys {
    #[serde(rename = "ApiToken", default)]
    pub api_token: String,

    #[serde(rename = "ZoneId", default)]
    pub zone_id: String,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("api_token", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

/// DNS record as seen by the zone API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub record_type: String,
    pub name: String,
    pub content: String,
}

/// Routing mode requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Expose the port as an HTTP service
    #[default]
    Http,
    /// Expose the port as a raw TCP service
    Tcp,
    /// Raw TCP for the port plus a SOCKS5 relay behind a second hostname
    All,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::All => write!(f, "all"),
        }
    }
}

/// A hostname routed to a local service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub hostname: String,
    pub service: String,
}

impl Route {
    pub fn new(hostname: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            service: service.into(),
        }
    }

    pub fn is_http(&self) -> bool {
        self.service.starts_with("http://") || self.service.starts_with("https://")
    }
}
