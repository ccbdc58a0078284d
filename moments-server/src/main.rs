//! Moments Server - REST API for photo ingestion and similarity reconciliation
//!
//! Ingests photos and facecams, derives compressed representations on a
//! detached path, and reconciles similarity match sets reported by the
//! recognition process.

use moments_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moments_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let state = AppState::from_config(&config).await?;

    let app = create_router_with_config(&config, state);

    let addr = config.socket_addr();
    tracing::info!(%addr, "moments-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
