//! Shared constants for Mailgate components.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8765";

/// Default directory holding form definitions
pub const DEFAULT_FORMS_PATH: &str = "forms";

/// Token cache entry lifetime (10 minutes)
pub const DEFAULT_CACHE_LIFETIME_SECS: u64 = 600;

/// Business expiry window baked into each token (10 minutes)
pub const DEFAULT_TOKEN_EXPIRATION_SECS: u64 = 600;

/// Minimum plausible time between token issuance and submission
pub const DEFAULT_MIN_SUBMISSION_SECS: u64 = 3;

/// Server-wide request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Timeout for a single captcha verification call
pub const DEFAULT_CAPTCHA_TIMEOUT_SECS: u64 = 10;

/// Timeout for SMTP delivery
pub const DEFAULT_MAIL_TIMEOUT_SECS: u64 = 30;

/// Maximum accepted multipart body size (32 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 << 20;

/// CORS preflight cache duration in seconds
pub const ACCESS_CONTROL_MAX_AGE: &str = "600";

/// Encoding advertised to clients for submissions
pub const SUBMISSION_ENCODING: &str = "multipart/form-data";

/// HTTP method advertised to clients for submissions
pub const SUBMISSION_METHOD: &str = "POST";

/// Canned delivery response used when a form runs in dry-run mode
pub const DRY_RUN_RESPONSE: &str = "dry-run succeeded";

/// Supported form definition file extensions, in lookup order
pub const FORM_FILE_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Captcha provider endpoints and submitted solution field names
pub mod captcha {
    pub const HCAPTCHA_ENDPOINT: &str = "https://hcaptcha.com/siteverify";
    pub const TURNSTILE_ENDPOINT: &str =
        "https://challenges.cloudflare.com/turnstile/v0/siteverify";
    pub const RECAPTCHA_ENDPOINT: &str = "https://www.google.com/recaptcha/api/siteverify";

    pub const PRIVATE_CAPTCHA_FIELD: &str = "private-captcha-solution";
    pub const HCAPTCHA_FIELD: &str = "h-captcha-response";
    pub const TURNSTILE_FIELD: &str = "cf-turnstile-response";
    pub const RECAPTCHA_FIELD: &str = "g-recaptcha-response";
}

/// HTTP header names
pub mod headers {
    /// Forwarded scheme from a TLS-terminating proxy
    pub const X_FORWARDED_PROTO: &str = "X-Forwarded-Proto";

    /// Forwarded client address chain
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

    /// Client address set by a reverse proxy
    pub const X_REAL_IP: &str = "X-Real-IP";

    /// API key header for Private Captcha
    pub const X_API_KEY: &str = "X-Api-Key";
}
