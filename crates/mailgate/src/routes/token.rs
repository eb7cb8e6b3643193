//! Token issuance endpoint.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, header},
};
use mailgate_common::TokenResponse;
use mailgate_common::constants::headers::X_FORWARDED_PROTO;

use crate::error::ApiError;
use crate::response::ApiSuccess;
use crate::state::AppState;

/// Issue a submission token for an allow-listed origin
pub async fn issue_token(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
) -> Result<ApiSuccess<TokenResponse>, ApiError> {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    let base_url = base_url(&headers, &state.config.listen_addr);

    let token = state.issuer.issue(&form_id, origin, &base_url).await?;

    Ok(ApiSuccess::created("sender token successfully created", token))
}

/// `{scheme}://{host}` the client reached us on
fn base_url(headers: &HeaderMap, fallback_host: &str) -> String {
    let scheme = match headers.get(X_FORWARDED_PROTO).and_then(|v| v.to_str().ok()) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or(fallback_host);

    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_base_url() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers, "127.0.0.1:8765"), "http://127.0.0.1:8765");

        headers.insert(header::HOST, HeaderValue::from_static("relay.example.com"));
        assert_eq!(base_url(&headers, "127.0.0.1:8765"), "http://relay.example.com");

        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
        assert_eq!(base_url(&headers, "127.0.0.1:8765"), "https://relay.example.com");
    }
}
