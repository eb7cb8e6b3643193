//! HTTP route handlers for Mailgate.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode, header},
    middleware,
    routing::{get, post},
};
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::state::AppState;

mod client;
mod cors;
mod health;
mod send;
mod token;

/// Value of the `Server` header on every response
const SERVER_HEADER: &str = concat!("mailgate/", env!("CARGO_PKG_VERSION"));

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    // Per-form routes run behind the CORS allow-list check
    let form_routes = Router::new()
        .route("/token/{form_id}", get(token::issue_token).options(options_fallback))
        .route("/send/{form_id}/{hash}", post(send::send_form).options(options_fallback))
        .route_layer(middleware::from_fn_with_state(state.clone(), cors::preflight_check));

    Router::new()
        // Health & Status
        .route("/ping", get(health::ping))
        .route("/health", get(health::health_check))
        .merge(form_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(SERVER_HEADER),
        ))
        .with_state(state)
}

/// OPTIONS that is not a CORS preflight
async fn options_fallback() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests;
