//! Health check endpoints.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::response::ApiSuccess;
use crate::state::AppState;

#[derive(Serialize)]
pub struct PingResponse {
    ping: &'static str,
}

/// Liveness probe
pub async fn ping() -> ApiSuccess<PingResponse> {
    ApiSuccess::ok("ping request received", PingResponse { ping: "pong" })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Issued tokens not yet consumed or swept
    pending_tokens: usize,
}

/// Basic health check (is the server running?)
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pending_tokens: state.cache.len().await,
    })
}
