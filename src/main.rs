//! TradeEasy Analytics server binary

use std::sync::Arc;
use tradeeasy::api::ApiServer;
use tradeeasy::config::ServerConfig;
use tradeeasy::scheduler::FeedHealthScheduler;
use tradeeasy::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tradeeasy=debug")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        "Starting TradeEasy Analytics v{} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.host,
        config.port
    );

    let state = Arc::new(AppState::new(config)?);

    let mut server = ApiServer::new(state.clone());
    server.start().await?;

    FeedHealthScheduler::new(state).start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    server.stop();

    Ok(())
}
