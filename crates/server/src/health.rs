use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub artifact_present: bool,
}

/// `GET /healthz` — liveness only. By the time this can be reached the
/// process has already bound its Redis client and spawned the tick loop;
/// this does not itself probe Redis so a transient outage there doesn't
/// flip liveness — a `TransientExternal` error is recoverable at the next
/// tick, not a reason to restart the process.
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        artifact_present: state.index_cache.artifact_exists(),
    })
}
