//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::captcha::CaptchaVerifier;
use crate::config::AppConfig;
use crate::forms::FormProvider;
use crate::mail::Mailer;
use crate::submission::SubmissionValidator;
use crate::token::{TokenCache, TokenIssuer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Form definitions
    pub forms: Arc<dyn FormProvider>,

    /// Pending submissions keyed by token
    pub cache: Arc<TokenCache>,

    /// Token issuer
    pub issuer: Arc<TokenIssuer>,

    /// Submission validator
    pub validator: Arc<SubmissionValidator>,
}

impl AppState {
    /// Wire up the services around one shared token cache
    pub fn new(config: AppConfig, forms: Arc<dyn FormProvider>) -> Result<Self> {
        let cache = Arc::new(TokenCache::new(config.cache_lifetime()));

        let captcha = CaptchaVerifier::new(
            config.captcha.endpoints(),
            Duration::from_secs(config.captcha.timeout_secs),
        )
        .context("Failed to build captcha HTTP client")?;
        let mailer = Mailer::new(Duration::from_secs(config.mail.timeout_secs));

        let issuer = Arc::new(TokenIssuer::new(
            forms.clone(),
            cache.clone(),
            config.token_expiration(),
        ));
        let validator = Arc::new(SubmissionValidator::new(
            cache.clone(),
            Arc::new(captcha),
            Arc::new(mailer),
            config.min_submission_interval(),
        ));

        Ok(Self {
            config,
            forms,
            cache,
            issuer,
            validator,
        })
    }
}
