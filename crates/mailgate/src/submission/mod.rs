//! Submission validation.
//!
//! A submission moves from pending (token cached, unconsumed) to a single
//! terminal outcome. The token is consumed before any other check runs, so
//! a second attempt with the same token always fails, whatever happened to
//! the first one.

mod antispam;
mod fields;

pub use antispam::{misses_random_field, trips_honeypot};
pub use fields::validate_fields;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mailgate_common::{FormConfig, RelayError, SendResponse};
use subtle::ConstantTimeEq;

use crate::captcha::CaptchaVerifier;
use crate::mail::Mailer;
use crate::token::{TokenCache, TokenMeta, derive_token};

/// Submitted text fields; a name may repeat
#[derive(Debug, Clone, Default)]
pub struct Submission {
    values: HashMap<String, Vec<String>>,
}

impl Submission {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    /// First value submitted for `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.values.iter()
    }

    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut submission = Self::default();
        for (name, value) in pairs {
            submission.push(name, value);
        }
        submission
    }
}

/// A consumed token whose form snapshot still awaits the submitted body
#[derive(Debug)]
pub struct PendingSubmission {
    pub form: Arc<FormConfig>,
    pub meta: TokenMeta,
}

/// Validates submissions against their cached token state and dispatches mail
pub struct SubmissionValidator {
    cache: Arc<TokenCache>,
    captcha: Arc<CaptchaVerifier>,
    mailer: Arc<Mailer>,
    /// Minimum time between issuance and submission
    min_interval: Duration,
}

impl SubmissionValidator {
    pub fn new(
        cache: Arc<TokenCache>,
        captcha: Arc<CaptchaVerifier>,
        mailer: Arc<Mailer>,
        min_interval: Duration,
    ) -> Self {
        Self {
            cache,
            captcha,
            mailer,
            min_interval,
        }
    }

    /// Consume the token and re-derive it against the presenting origin.
    ///
    /// Never-issued, expired, already-used and mismatching tokens all yield
    /// the same `NotFound`.
    pub async fn consume(
        &self,
        form_id: &str,
        hash: &str,
        origin: Option<&str>,
    ) -> Result<PendingSubmission, RelayError> {
        let Some((form, meta)) = self.cache.take(hash).await else {
            tracing::warn!(form_id = %form_id, origin = ?origin, "Token not found in cache");
            return Err(RelayError::NotFound);
        };

        if !form.id.eq_ignore_ascii_case(form_id) {
            tracing::warn!(
                form_id = %form_id,
                cached_form_id = %form.id,
                "Form id does not match the token"
            );
            return Err(RelayError::NotFound);
        }

        let expected = derive_token(
            origin.unwrap_or_default(),
            meta.created_at,
            meta.expires_at,
            &form.id,
            &form.secret,
        );
        let matches = hex::decode(hash)
            .map(|provided| bool::from(provided.ct_eq(expected.as_slice())))
            .unwrap_or(false);
        if !matches {
            tracing::warn!(form_id = %form.id, origin = ?origin, "Token does not match origin");
            return Err(RelayError::NotFound);
        }

        if Utc::now() > meta.expires_at {
            tracing::warn!(form_id = %form.id, expired_at = %meta.expires_at, "Token expired");
            return Err(RelayError::NotFound);
        }

        Ok(PendingSubmission { form, meta })
    }

    /// Run the anti-spam, field, and captcha checks, then dispatch the mail
    pub async fn complete(
        &self,
        pending: PendingSubmission,
        submission: &Submission,
        remote_ip: Option<&str>,
    ) -> Result<SendResponse, RelayError> {
        let PendingSubmission { form, meta } = pending;
        let validation = &form.validation;

        if let Some(honeypot) = validation.honeypot_field() {
            if trips_honeypot(honeypot, submission) {
                tracing::warn!(form_id = %form.id, "Honeypot field was filled");
                return Err(RelayError::SpamDetected);
            }
        }

        if let Some(random_field) = &meta.random_field {
            if misses_random_field(random_field, submission) {
                tracing::warn!(form_id = %form.id, "Random anti-spam field not echoed");
                return Err(RelayError::SpamDetected);
            }
        }

        if !validation.disable_submission_speed_check {
            let elapsed = (Utc::now() - meta.created_at).to_std().unwrap_or_default();
            if elapsed < self.min_interval {
                tracing::warn!(
                    form_id = %form.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Submission arrived too early"
                );
                return Err(RelayError::TooEarly);
            }
        }

        let violations = validate_fields(&validation.fields, submission);
        if !violations.is_empty() {
            tracing::warn!(form_id = %form.id, violations = ?violations, "Field validation failed");
            return Err(RelayError::Validation(violations));
        }

        self.captcha
            .verify_all(validation, submission, remote_ip)
            .await
            .map_err(|e| {
                tracing::warn!(form_id = %form.id, error = %e, "Captcha verification failed");
                RelayError::Upstream(format!("{} validation failed", e.provider()))
            })?;

        let delivery = self.mailer.dispatch(&form, submission).await.map_err(|e| {
            tracing::error!(form_id = %form.id, error = %e, "Mail delivery failed");
            RelayError::Delivery(e.to_string())
        })?;

        tracing::info!(
            form_id = %form.id,
            dry_run = form.server.dry_run,
            "📨 Form submission delivered"
        );

        Ok(SendResponse {
            form_id: form.id.clone(),
            sent_at: Utc::now().timestamp(),
            confirmation_sent: delivery.confirmation_response.is_some(),
            confirmation_response: delivery.confirmation_response.unwrap_or_default(),
            message_response: delivery.message_response,
        })
    }
}
