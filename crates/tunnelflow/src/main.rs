mod commands;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tunnelflow_core::Protocol;

#[derive(Parser)]
#[command(name = "tunnelflow")]
#[command(about = "Cloudflare Tunnel を用意して、ローカルのポートを公開する", long_about = None)]
#[command(version)]
struct Cli {
    /// 公開するローカルポート (例: 22, 5173)
    #[arg(long)]
    port: Option<u16>,

    /// 公開方式 (http, tcp, all)
    #[arg(long, value_enum, default_value_t = ProtocolArg::Http)]
    protocol: ProtocolArg,

    /// トンネル名（新規作成時のみ使用）
    #[arg(long)]
    tunnel: Option<String>,

    /// 公開ホスト名 (例: app.example.com)
    #[arg(long)]
    domain: Option<String>,

    /// SOCKS5 プロキシ用のホスト名（--protocol all で必須）
    #[arg(long)]
    proxy_domain: Option<String>,

    /// トンネル認証情報ファイル
    #[arg(
        long,
        env = "TUNNELFLOW_CREDENTIALS",
        default_value = "./credentials.json"
    )]
    credentials: PathBuf,

    /// API キーファイル (ApiToken, ZoneId)
    #[arg(
        long = "apiKeys",
        visible_alias = "api-keys",
        env = "TUNNELFLOW_API_KEYS",
        default_value = "./api-keys.json"
    )]
    api_keys: PathBuf,

    /// ローカル SOCKS5 プロキシのポート（--protocol all のみ）
    #[arg(long, default_value_t = 1080)]
    socks5_port: u16,

    /// cloudflared 実行ファイル
    #[arg(long, env = "CLOUDFLARED_BIN", default_value = "cloudflared")]
    cloudflared: PathBuf,

    /// 停止時に SIGKILL へ切り替えるまでの秒数
    #[arg(long, default_value_t = 10)]
    shutdown_timeout: u64,

    /// 終了時に cloudflared からログアウトする
    #[arg(long)]
    logout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProtocolArg {
    Http,
    Tcp,
    All,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Http => Protocol::Http,
            ProtocolArg::Tcp => Protocol::Tcp,
            ProtocolArg::All => Protocol::All,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr に出力（RUST_LOG で上書き可能）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let session = commands::Session {
        credentials: cli.credentials,
        cloudflared: cli.cloudflared,
        config_dir: PathBuf::from("."),
        protocol: cli.protocol.into(),
        socks5_port: cli.socks5_port,
        shutdown_timeout: std::time::Duration::from_secs(cli.shutdown_timeout),
        logout: cli.logout,
    };

    // ポート・トンネル名・ドメインが揃っていなければ前回の設定で再起動
    match (cli.port, cli.tunnel, cli.domain) {
        (Some(port), Some(tunnel), Some(domain)) if !tunnel.is_empty() && !domain.is_empty() => {
            let request = commands::up::UpRequest {
                port,
                tunnel,
                domain,
                proxy_domain: cli.proxy_domain,
                api_keys: cli.api_keys,
            };
            commands::up::handle(&session, request).await
        }
        _ => commands::resume::handle(&session).await,
    }
}
