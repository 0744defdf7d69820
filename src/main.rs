use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use freeai_image_gateway::config::GatewayConfig;
use freeai_image_gateway::proxy::GatewayServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(GatewayConfig::from_env());
    let (server, handle) = GatewayServer::start(config)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    server.stop();
    handle.await?;

    Ok(())
}
