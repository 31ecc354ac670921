use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use keygate::auth::BearerAuth;
use keygate::cli::Cli;
use keygate::core::Gateway;
use keygate::pool::{self, KeyPool};
use keygate::upstream::UpstreamClient;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("keygate failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let pool = Arc::new(KeyPool::new(&cli.keys_file));
    if let Err(err) = pool.reload().await {
        warn!(error = %err, "initial session key load failed, starting with an empty pool");
    }

    let auth = BearerAuth::from_secret(&cli.shared_secret);
    let upstream = UpstreamClient::new(cli.upstream_url.clone(), cli.upstream_token());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(pool::refresh_loop(
        pool.clone(),
        cli.refresh_interval(),
        shutdown_rx,
    ));

    let gateway = Gateway::new(auth, pool, upstream, cli.selection);
    let app = gateway.router();

    let bind = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keygate=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
