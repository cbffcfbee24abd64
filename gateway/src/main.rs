mod api;
mod routes;

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::routes::{build_router, AppState, CHAT_PATH};
use glmrelay_core::{Orchestrator, RelayConfig, ZhipuGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging Setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("GLM Relay Gateway Initializing...");

    // 2. Configuration (read once, shared read-only)
    let config = Arc::new(RelayConfig::from_env().context("Failed to load configuration")?);
    info!(
        "Variant: {} | Model: {} | Tool choice: {:?}",
        config.variant, config.model, config.tool_choice
    );

    // 3. Upstream client + pipeline
    let gateway = Arc::new(ZhipuGateway::new(&config));
    let orchestrator = Orchestrator::new(gateway, config.clone());

    // 4. Routes
    let app = build_router(AppState { orchestrator });

    // 5. Start Server
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Gateway listening on {} (POST {})", config.bind_addr, CHAT_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received.");
}
