//! Configuration management for Mailgate.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use mailgate_common::constants::{
    DEFAULT_CACHE_LIFETIME_SECS, DEFAULT_CAPTCHA_TIMEOUT_SECS, DEFAULT_FORMS_PATH,
    DEFAULT_LISTEN_ADDR, DEFAULT_MAIL_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_MIN_SUBMISSION_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOKEN_EXPIRATION_SECS,
    captcha::{HCAPTCHA_ENDPOINT, RECAPTCHA_ENDPOINT, TURNSTILE_ENDPOINT},
};

use crate::captcha::CaptchaEndpoints;

/// Prefix of environment overrides, e.g. `MAILGATE__FORMS__PATH`
const ENV_PREFIX: &str = "MAILGATE";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Form store and token settings
    #[serde(default)]
    pub forms: FormsConfig,

    /// Token cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP server limits
    #[serde(default)]
    pub server: ServerConfig,

    /// Captcha provider settings
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// SMTP delivery settings
    #[serde(default)]
    pub mail: MailConfig,
}

/// Form store and token settings
#[derive(Debug, Clone, Deserialize)]
pub struct FormsConfig {
    /// Directory holding one definition file per form
    #[serde(default = "default_forms_path")]
    pub path: String,

    /// Business expiry window of an issued token
    #[serde(default = "default_token_expiration")]
    pub token_expiration_secs: u64,

    /// Submissions arriving sooner after issuance are rejected
    #[serde(default = "default_min_submission")]
    pub min_submission_secs: u64,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            path: default_forms_path(),
            token_expiration_secs: default_token_expiration(),
            min_submission_secs: default_min_submission(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime, also the sweep interval
    #[serde(default = "default_cache_lifetime")]
    pub lifetime_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: default_cache_lifetime(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Multipart body limit
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Captcha verification endpoints and timeout
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default = "default_hcaptcha_url")]
    pub hcaptcha_url: String,

    #[serde(default = "default_turnstile_url")]
    pub turnstile_url: String,

    #[serde(default = "default_recaptcha_url")]
    pub recaptcha_url: String,

    #[serde(default = "default_captcha_timeout")]
    pub timeout_secs: u64,
}

impl CaptchaConfig {
    pub fn endpoints(&self) -> CaptchaEndpoints {
        CaptchaEndpoints {
            hcaptcha: self.hcaptcha_url.clone(),
            turnstile: self.turnstile_url.clone(),
            recaptcha: self.recaptcha_url.clone(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            hcaptcha_url: default_hcaptcha_url(),
            turnstile_url: default_turnstile_url(),
            recaptcha_url: default_recaptcha_url(),
            timeout_secs: default_captcha_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_mail_timeout(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_forms_path() -> String { DEFAULT_FORMS_PATH.to_string() }
fn default_token_expiration() -> u64 { DEFAULT_TOKEN_EXPIRATION_SECS }
fn default_min_submission() -> u64 { DEFAULT_MIN_SUBMISSION_SECS }
fn default_cache_lifetime() -> u64 { DEFAULT_CACHE_LIFETIME_SECS }
fn default_request_timeout() -> u64 { DEFAULT_REQUEST_TIMEOUT_SECS }
fn default_max_body_bytes() -> usize { DEFAULT_MAX_BODY_BYTES }
fn default_hcaptcha_url() -> String { HCAPTCHA_ENDPOINT.to_string() }
fn default_turnstile_url() -> String { TURNSTILE_ENDPOINT.to_string() }
fn default_recaptcha_url() -> String { RECAPTCHA_ENDPOINT.to_string() }
fn default_captcha_timeout() -> u64 { DEFAULT_CAPTCHA_TIMEOUT_SECS }
fn default_mail_timeout() -> u64 { DEFAULT_MAIL_TIMEOUT_SECS }

impl AppConfig {
    /// Load configuration from file and `MAILGATE__*` variables, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let path = Path::new(config_path);
        if !path.exists() {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to load config file")?;

        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref forms) = args.forms {
            config.forms.path = forms.clone();
        }

        Ok(config)
    }

    pub fn cache_lifetime(&self) -> Duration {
        Duration::from_secs(self.cache.lifetime_secs)
    }

    pub fn token_expiration(&self) -> Duration {
        Duration::from_secs(self.forms.token_expiration_secs)
    }

    pub fn min_submission_interval(&self) -> Duration {
        Duration::from_secs(self.forms.min_submission_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            forms: FormsConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
            captcha: CaptchaConfig::default(),
            mail: MailConfig::default(),
        }
    }
}
