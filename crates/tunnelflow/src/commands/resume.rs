use super::Session;
use anyhow::Context;
use colored::Colorize;
use tunnelflow_core::{CredentialStore, IngressConfig, config_path};

/// 前回生成した設定ファイルでトンネルを再起動する（DNS・設定の更新なし）
pub async fn handle(session: &Session) -> anyhow::Result<()> {
    let store = CredentialStore::new(&session.credentials);
    let identity = store
        .load()
        .await
        .context("previous configuration not found (pass --port, --tunnel and --domain to set up a tunnel)")?;

    let path = config_path(&session.config_dir, &identity.tunnel_id);
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("config {} not found", path.display()))?;
    let config = IngressConfig::from_yaml(&content)
        .with_context(|| format!("config {} is not a valid ingress config", path.display()))?;

    println!(
        "前回の設定で再起動します: {} ({} ルール)",
        path.display().to_string().cyan(),
        config.ingress.len()
    );

    let cli = session.cli();
    super::supervise(session, &cli, &path).await
}

