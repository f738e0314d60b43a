//! Cloudflare provider for tunnelflow
//!
//! Implements the `tunnelflow-core` provider traits on top of Cloudflare:
//!
//! - DNS record lookup/creation via the Cloudflare v4 API
//!   ([`CloudflareDns`], a [`tunnelflow_core::DnsProvider`])
//! - Tunnel login, creation and the daemon command via the `cloudflared`
//!   CLI ([`Cloudflared`], a [`tunnelflow_core::TunnelCli`])
//!
//! # Requirements
//!
//! - `cloudflared` must be installed (or its path passed to [`Cloudflared::new`])
//! - For DNS: an API key file with `ApiToken` and `ZoneId`
//!
//! # Example
//!
//! ```ignore
//! use tunnelflow_cloudflare::{CloudflareDns, Cloudflared};
//! use tunnelflow_core::{CredentialStore, ensure_tunnel_record, resolve_identity};
//!
//! let cli = Cloudflared::default();
//! let store = CredentialStore::new("./credentials.json");
//! let identity = resolve_identity(&store, &cli, Some("dev")).await?;
//!
//! let dns = CloudflareDns::from_keys_file("./api-keys.json").await?;
//! ensure_tunnel_record(&dns, "app.example.com", &identity.tunnel_id).await?;
//! ```

pub mod cloudflared;
pub mod dns;
pub mod error;

pub use cloudflared::Cloudflared;
pub use dns::CloudflareDns;
pub use error::{CloudflareError, Result};
