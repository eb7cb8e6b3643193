//! Per-form CORS allow-list.

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    http::{
        HeaderValue, Method,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
            ORIGIN, VARY,
        },
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use mailgate_common::RelayError;
use mailgate_common::constants;

use crate::error::ApiError;
use crate::state::AppState;

const ALLOWED_METHODS: &str = "GET, POST";

/// Check the request origin against the form's allow-list.
///
/// Requests without an Origin, or for a form that does not load, pass
/// through untouched so the handler reports the problem itself. A foreign
/// origin is refused outright only on preflights; other requests reach the
/// handler without CORS headers.
pub async fn preflight_check(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(origin) = request
        .headers()
        .get(ORIGIN)
        .filter(|v| !v.is_empty())
        .cloned()
    else {
        return next.run(request).await;
    };

    let Some(form_id) = params.get("form_id") else {
        tracing::warn!(path = %request.uri().path(), "Missing form id");
        return next.run(request).await;
    };

    let form = match state.forms.load(form_id) {
        Ok(form) => form,
        Err(e) => {
            tracing::debug!(form_id = %form_id, error = %e, "Form not loadable for CORS check");
            return next.run(request).await;
        }
    };

    let is_preflight =
        request.method() == Method::OPTIONS && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);

    let allowed = origin.to_str().is_ok_and(|o| form.allows_origin(o));
    if !allowed {
        tracing::warn!(form_id = %form.id, origin = ?origin, "Origin not allowed");
        if is_preflight {
            return ApiError(RelayError::Forbidden("domain not allowed".to_string())).into_response();
        }
        // The handler still runs so a presented token is consumed; the
        // browser drops the response without CORS headers
        return next.run(request).await;
    }

    let mut response = if is_preflight {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        if let Some(requested) = request.headers().get(ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(constants::ACCESS_CONTROL_MAX_AGE),
        );
        response
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(VARY, HeaderValue::from_static("Origin"));

    response
}
