use anyhow::Result;
use clap::Parser;
use server::{router, AppState};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index snapshot file
    #[arg(long, env = "INDEX_PATH", default_value = "indexer/inverted_index.json")]
    index: String,
    /// Host to bind
    #[arg(long, env = "INDEX_HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 7003)]
    port: u16,
    /// Seconds between snapshot reloads, 0 disables
    #[arg(long, env = "RELOAD_SECS", default_value_t = 60)]
    reload_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let state = AppState::load(&args.index, std::env::var("ADMIN_TOKEN").ok())?;

    if args.reload_secs > 0 {
        let reloader = state.clone();
        let period = Duration::from_secs(args.reload_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = reloader.reload().await {
                    tracing::warn!(error = %e, "periodic reload failed, keeping previous snapshot");
                }
            }
        });
    }

    let app = router(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, reload_secs = args.reload_secs, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
