use anyhow::Result;
use chat_api::run as run_api;
use chat_core::{ChatContext, Config};
use tracing;
use tracing_subscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting goChat server");

    // Config::from_env loads .env first
    let config = Config::from_env();
    let ctx = ChatContext::new(config).await?;

    tracing::info!("Chat context initialized");

    tokio::select! {
        result = run_api(ctx) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
