use super::Session;
use anyhow::Context;
use colored::Colorize;
use std::path::PathBuf;
use tunnelflow_cloudflare::CloudflareDns;
use tunnelflow_core::{
    CredentialStore, EnsureOutcome, IngressConfig, compute_routes, reconcile_dns, resolve_identity,
};

pub struct UpRequest {
    pub port: u16,
    pub tunnel: String,
    pub domain: String,
    pub proxy_domain: Option<String>,
    pub api_keys: PathBuf,
}

pub async fn handle(session: &Session, request: UpRequest) -> anyhow::Result<()> {
    // 副作用の前にフラグの組み合わせを検証
    let routes = compute_routes(
        session.protocol,
        &request.domain,
        request.port,
        request.proxy_domain.as_deref(),
        session.socks5_port,
    )
    .context("invalid routing options")?;

    println!("トンネル: {}", request.tunnel.cyan());
    println!("方式: {}", session.protocol.to_string().cyan());

    let dns = CloudflareDns::from_keys_file(&request.api_keys)
        .await
        .context("failed to load API keys")?;

    let cli = session.cli();
    let store = CredentialStore::new(&session.credentials);
    let identity = resolve_identity(&store, &cli, Some(request.tunnel.as_str()))
        .await
        .context("failed to resolve tunnel credentials")?;

    let outcomes = reconcile_dns(&dns, &routes, &identity.tunnel_id)
        .await
        .context("failed to ensure DNS record")?;
    for (hostname, outcome) in &outcomes {
        match outcome {
            EnsureOutcome::Created => println!("  ✓ DNS レコード作成: {}", hostname.cyan()),
            EnsureOutcome::Existing => println!("  ℹ DNS レコードは既に存在します: {}", hostname),
        }
    }

    println!();
    println!("{}", format!("ルート一覧 ({} 個):", routes.len()).bold());
    for route in &routes {
        println!("  • {} → {}", route.hostname.cyan(), route.service);
    }

    let config = IngressConfig::new(&identity.tunnel_id, store.path(), &routes)
        .context("failed to build ingress config")?;
    let config_path = config
        .write(&session.config_dir)
        .await
        .context("failed to write config file")?;

    super::supervise(session, &cli, &config_path).await
}
