//! HTTP rendering of relay errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailgate_common::{ErrorEnvelope, RelayError};

const ERROR_MESSAGE: &str = "request could not be processed";

/// Handler error, rendered as the JSON error envelope
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let envelope = ErrorEnvelope {
            success: false,
            status_code: status.as_u16(),
            status: reason_phrase(status).to_string(),
            message: ERROR_MESSAGE.to_string(),
            errors: self.0.client_errors(),
        };

        (status, Json(envelope)).into_response()
    }
}

/// Older `http` releases lack a canonical reason for 425
pub(crate) fn reason_phrase(status: StatusCode) -> &'static str {
    match status.canonical_reason() {
        Some(reason) => reason,
        None if status.as_u16() == 425 => "Too Early",
        None => "Unknown",
    }
}
