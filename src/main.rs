use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use chalkboard::config::{Cli, Config};
use chalkboard::routes;
use chalkboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;

    let config = Config::load(&cli)?;
    tracing::info!(
        backend = ?config.storage.backend,
        "Board data lives under {}",
        data_dir.display()
    );
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Every store loads its snapshot before the first request is served
    let app = routes::app(AppState::open(config).await?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Board ready at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Board stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
