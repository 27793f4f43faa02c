//! Axum router wiring.
//!
//! Operational endpoints are served directly; every other request goes
//! through the plugin pipeline.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .fallback(transport::http::handle)
        .with_state(state)
}
