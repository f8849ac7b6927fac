use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{health, ws};

/// Assemble the HTTP/WebSocket surface: `/healthz` for liveness and `/ws`
/// for per-user room-assignment delivery. Identity issuance, profile
/// CRUD, and CORS are deliberately absent — there is no auth layer here
/// to bypass.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/ws", get(ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
