//! HTTP rendering of successful responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailgate_common::SuccessEnvelope;
use serde::Serialize;

use crate::error::reason_phrase;

/// Handler result body, rendered inside the JSON success envelope
#[derive(Debug)]
pub struct ApiSuccess<T> {
    status: StatusCode,
    message: &'static str,
    data: T,
}

impl<T> ApiSuccess<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self::new(StatusCode::OK, message, data)
    }

    pub fn created(message: &'static str, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, data)
    }

    fn new(status: StatusCode, message: &'static str, data: T) -> Self {
        Self { status, message, data }
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        let envelope = SuccessEnvelope::new(
            self.status.as_u16(),
            reason_phrase(self.status),
            self.message,
            self.data,
        );

        (self.status, Json(envelope)).into_response()
    }
}
