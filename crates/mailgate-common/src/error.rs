//! Error taxonomy for the submission protocol.

use thiserror::Error;

/// Message shared by every failure that must not reveal which check tripped.
pub const INVALID_FORM_OR_TOKEN: &str = "invalid form ID or token";

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed request or body
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Origin missing or not allow-listed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown, expired, consumed, or mismatching token
    #[error("invalid form ID or token")]
    NotFound,

    /// Honeypot or random anti-spam field tripped
    #[error("invalid form ID or token")]
    SpamDetected,

    /// Aggregated field violations, one entry per field
    #[error("field validation failed")]
    Validation(Vec<String>),

    /// Submission arrived faster than a human could fill the form
    #[error("submission arrived too early")]
    TooEarly,

    /// Captcha provider unreachable or rejecting the solution
    #[error("Captcha error: {0}")]
    Upstream(String),

    /// Mail transport failure
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound | Self::SpamDetected => 404,
            Self::Validation(_) => 400,
            Self::TooEarly => 425,
            Self::Upstream(_) => 400,
            Self::Delivery(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Messages safe to hand to the submitter.
    ///
    /// Delivery and internal failures carry transport details that stay in
    /// the server log; clients only learn that processing failed.
    pub fn client_errors(&self) -> Vec<String> {
        match self {
            Self::Validation(violations) => violations.clone(),
            Self::NotFound | Self::SpamDetected => vec![INVALID_FORM_OR_TOKEN.to_string()],
            Self::Delivery(_) => vec!["failed to deliver message".to_string()],
            Self::Internal(_) => vec!["internal server error".to_string()],
            other => vec![other.to_string()],
        }
    }
}
