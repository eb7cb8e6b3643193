//! Submission token issuance.
//!
//! A token is the hex SHA-256 of the requesting origin, the issue and
//! expiry timestamps, the form id, and the form secret. It doubles as the
//! cache key under which the form snapshot waits for its one submission.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use mailgate_common::constants::{SUBMISSION_ENCODING, SUBMISSION_METHOD};
use mailgate_common::{FormConfig, RandomField, RelayError, TokenResponse};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::cache::ExpiringCache;
use crate::forms::FormProvider;

/// State recorded alongside the form snapshot at issuance
#[derive(Debug, Clone)]
pub struct TokenMeta {
    pub created_at: DateTime<Utc>,
    /// Business expiry, bound into the hash
    pub expires_at: DateTime<Utc>,
    pub random_field: Option<RandomField>,
}

/// Pending submissions keyed by token
pub type TokenCache = ExpiringCache<Arc<FormConfig>, TokenMeta>;

/// Compute the raw token digest.
///
/// The hash is keyed only by the form's own secret, so anyone holding that
/// secret can mint tokens without asking the issuer.
pub fn derive_token(
    origin: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    form_id: &str,
    secret: &str,
) -> [u8; 32] {
    let value = format!(
        "{}_{}_{}_{}_{}",
        origin,
        created_at.timestamp_nanos_opt().unwrap_or_default(),
        expires_at.timestamp_nanos_opt().unwrap_or_default(),
        form_id,
        secret
    );
    Sha256::digest(value.as_bytes()).into()
}

/// Issues tokens for allow-listed origins
pub struct TokenIssuer {
    forms: Arc<dyn FormProvider>,
    cache: Arc<TokenCache>,
    /// Business expiry window
    expiration: Duration,
}

impl TokenIssuer {
    pub fn new(forms: Arc<dyn FormProvider>, cache: Arc<TokenCache>, expiration: Duration) -> Self {
        Self {
            forms,
            cache,
            expiration,
        }
    }

    /// Issue a token for `form_id`, requested from `origin`.
    ///
    /// `base_url` is the scheme and host the client should post back to.
    /// No cache entry is written unless every check passes.
    pub async fn issue(
        &self,
        form_id: &str,
        origin: Option<&str>,
        base_url: &str,
    ) -> Result<TokenResponse, RelayError> {
        let form = self.forms.load(form_id).map_err(|e| {
            tracing::warn!(form_id = %form_id, error = %e, "Failed to load form");
            RelayError::InvalidInput(format!("unknown form: {form_id}"))
        })?;

        let origin = match origin.filter(|o| !o.is_empty()) {
            Some(origin) if form.allows_origin(origin) => origin,
            other => {
                tracing::warn!(
                    form_id = %form.id,
                    origin = ?other,
                    allowed_domains = ?form.domains,
                    "Origin not allowed"
                );
                return Err(RelayError::Forbidden("domain not allowed".to_string()));
            }
        };

        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(self.expiration)
                .map_err(|e| RelayError::Internal(format!("invalid token expiration: {e}")))?;

        let token = hex::encode(derive_token(
            origin,
            created_at,
            expires_at,
            &form.id,
            &form.secret,
        ));

        let random_field = form
            .validation
            .random_anti_spam_field
            .then(generate_random_field);

        let response = TokenResponse {
            token: token.clone(),
            form_id: form.id.clone(),
            create_time: created_at.timestamp(),
            expire_time: expires_at.timestamp(),
            url: format!(
                "{}/send/{}/{}",
                base_url.trim_end_matches('/'),
                urlencoding::encode(&form.id),
                token
            ),
            encoding: SUBMISSION_ENCODING.to_string(),
            request_method: SUBMISSION_METHOD.to_string(),
            random_field: random_field.clone(),
        };

        tracing::debug!(form_id = %form.id, origin = %origin, "Issued submission token");

        let meta = TokenMeta {
            created_at,
            expires_at,
            random_field,
        };
        self.cache.set(token, Arc::new(form), meta).await;

        Ok(response)
    }
}

/// Generate a per-token anti-spam field name and value
fn generate_random_field() -> RandomField {
    let mut rng = rand::rng();
    let name = format!("f_{:08x}", rng.random::<u32>());

    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);

    RandomField {
        name,
        value: URL_SAFE_NO_PAD.encode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::StaticForms;
    use crate::test_support::contact_form;

    fn issuer(forms: StaticForms) -> (TokenIssuer, Arc<TokenCache>) {
        let cache = Arc::new(TokenCache::new(Duration::from_secs(60)));
        let issuer = TokenIssuer::new(Arc::new(forms), cache.clone(), Duration::from_secs(600));
        (issuer, cache)
    }

    #[test]
    fn test_derive_token_is_deterministic() {
        let now = Utc::now();
        let later = now + chrono::Duration::minutes(10);

        let a = derive_token("https://example.com", now, later, "contact-form", "s3cr3t");
        let b = derive_token("https://example.com", now, later, "contact-form", "s3cr3t");
        let other_origin = derive_token("https://b.example", now, later, "contact-form", "s3cr3t");
        let other_secret = derive_token("https://example.com", now, later, "contact-form", "nope");

        assert_eq!(a, b);
        assert_ne!(a, other_origin);
        assert_ne!(a, other_secret);
        assert_eq!(hex::encode(a).len(), 64);
    }

    #[tokio::test]
    async fn test_issue_stores_snapshot() {
        let (issuer, cache) = issuer(StaticForms::default().with(contact_form()));

        let response = issuer
            .issue("contact-form", Some("https://example.com"), "http://localhost:8765")
            .await
            .unwrap();

        assert_eq!(response.token.len(), 64);
        assert!(response.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(response.form_id, "contact-form");
        assert_eq!(
            response.url,
            format!("http://localhost:8765/send/contact-form/{}", response.token)
        );
        assert_eq!(response.encoding, "multipart/form-data");
        assert_eq!(response.request_method, "POST");
        assert!(response.random_field.is_none());
        assert!(response.expire_time > response.create_time);

        let (form, meta) = cache.get(&response.token).await.unwrap();
        assert_eq!(form.id, "contact-form");
        let expected = derive_token(
            "https://example.com",
            meta.created_at,
            meta.expires_at,
            "contact-form",
            &form.secret,
        );
        assert_eq!(hex::encode(expected), response.token);
    }

    #[tokio::test]
    async fn test_issue_random_field() {
        let mut form = contact_form();
        form.validation.random_anti_spam_field = true;
        let (issuer, cache) = issuer(StaticForms::default().with(form));

        let response = issuer
            .issue("contact-form", Some("https://example.com"), "http://localhost")
            .await
            .unwrap();

        let field = response.random_field.unwrap();
        assert!(field.name.starts_with("f_"));
        assert!(!field.value.is_empty());

        let (_, meta) = cache.get(&response.token).await.unwrap();
        assert_eq!(meta.random_field, Some(field));
    }

    #[tokio::test]
    async fn test_issue_rejects_bad_origins() {
        let (issuer, cache) = issuer(StaticForms::default().with(contact_form()));

        for origin in [
            None,
            Some(""),
            Some("https://evil.com"),
            Some("http://example.com"),
            Some("example.com"),
        ] {
            let err = issuer
                .issue("contact-form", origin, "http://localhost")
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 403, "{origin:?}");
        }
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_issue_unknown_form() {
        let (issuer, cache) = issuer(StaticForms::default());

        let err = issuer
            .issue("missing", Some("https://example.com"), "http://localhost")
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(cache.len().await, 0);
    }
}
