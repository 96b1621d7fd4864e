use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use parley_bridge::Bridge;
use parley_core::config::ParleyConfig;

use crate::rocketchat::RocketChatHost;

/// Shared state passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub config: ParleyConfig,
    pub backend_name: String,
    pub host: Arc<RocketChatHost>,
    pub bridge: Arc<Bridge>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/webhooks/rocketchat",
            post(crate::http::webhooks::rocketchat_webhook),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
