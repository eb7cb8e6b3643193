//! Form submission endpoint.

use axum::{
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, header},
};
use mailgate_common::{RelayError, SendResponse};

use super::client::ClientAddr;
use crate::error::ApiError;
use crate::response::ApiSuccess;
use crate::state::AppState;
use crate::submission::Submission;

/// Validate a submission against its token and relay it
pub async fn send_form(
    State(state): State<AppState>,
    Path((form_id, hash)): Path<(String, String)>,
    ClientAddr(remote_ip): ClientAddr,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiSuccess<SendResponse>, ApiError> {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());

    // The token is gone from here on, whatever the body turns out to be
    let pending = state.validator.consume(&form_id, &hash, origin).await?;

    let multipart = multipart.map_err(|e| {
        tracing::error!(form_id = %form_id, error = %e, "Failed to read multipart request");
        RelayError::Internal(e.to_string())
    })?;
    let submission = read_submission(multipart).await.map_err(|e| {
        tracing::error!(form_id = %form_id, error = %e, "Failed to parse multipart body");
        RelayError::Internal(e.to_string())
    })?;

    let response = state
        .validator
        .complete(pending, &submission, remote_ip.as_deref())
        .await?;

    Ok(ApiSuccess::ok("form submission successfully sent", response))
}

/// Collect the text parts; file uploads are skipped
async fn read_submission(mut multipart: Multipart) -> Result<Submission, MultipartError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await?;
        submission.push(name, value);
    }

    Ok(submission)
}
