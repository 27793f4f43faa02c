//! gatewatch gateway binary.
//!
//! Loads `gatewatch.yaml` (or the path given as the first argument), builds
//! the pipeline with the metrics stage in front, and serves until Ctrl-C,
//! flipping `/readyz` to draining while in-flight requests finish.

use tracing_subscriber::{fmt, EnvFilter};

use gatewatch_core::error::{GatewatchError, Result};
use gatewatch_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "gatewatch-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gatewatch.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.gateway.listen_addr()?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "gatewatch-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| GatewatchError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(drain_on_ctrl_c(state))
        .await
        .map_err(|e| GatewatchError::Internal(format!("server failed: {e}")))?;

    tracing::info!("gatewatch-gateway stopped");
    Ok(())
}

async fn drain_on_ctrl_c(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.set_draining();
    tracing::info!("shutdown requested, draining");
}
