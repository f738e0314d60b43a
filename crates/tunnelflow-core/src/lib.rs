//! tunnelflow core
//!
//! Provider-independent pieces of the tunnel orchestration: the data model,
//! credential and API key stores, ingress config generation, the
//! orchestration steps and process supervision.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 tunnelflow CLI                   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               tunnelflow-core                    │
//! │  store → pipeline → ingress → supervisor/relay   │
//! │  trait DnsProvider / trait TunnelCli             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │   tunnelflow-cloudflare (API client, cloudflared) │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod ingress;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod relay;
pub mod store;
pub mod supervisor;

// Re-exports
pub use error::{Result, TunnelError};
pub use ingress::{IngressConfig, IngressRule, compute_routes, config_path};
pub use model::{ApiKeys, DnsRecord, Protocol, Route, TunnelIdentity};
pub use pipeline::{EnsureOutcome, ensure_tunnel_record, reconcile_dns, resolve_identity};
pub use provider::{DnsProvider, TunnelCli};
pub use store::{ApiKeyStore, CredentialStore};
pub use supervisor::{DaemonState, RunningDaemon, Supervisor, shutdown_signal};
