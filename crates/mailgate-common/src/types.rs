//! Core types shared across Mailgate components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered form, loaded read-only from the form store.
#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    /// Unique form identifier
    pub id: String,

    /// Per-form secret mixed into every token
    pub secret: String,

    /// Envelope and header sender address
    pub sender: String,

    /// Recipients of the relayed message
    pub recipients: Vec<String>,

    /// Domains allowed to request tokens (matched as `https://{domain}`)
    pub domains: Vec<String>,

    /// Message content settings
    #[serde(default)]
    pub content: ContentSettings,

    /// Optional confirmation mail sent back to the submitter
    #[serde(default)]
    pub confirmation: ConfirmationSettings,

    /// Optional Reply-To taken from a submitted field
    #[serde(default)]
    pub reply_to: ReplyToSettings,

    /// SMTP server settings
    pub server: SmtpSettings,

    /// Anti-spam and field validation settings
    #[serde(default)]
    pub validation: ValidationSettings,
}

impl FormConfig {
    /// Returns true if `origin` is `https://{domain}` for an allow-listed domain.
    ///
    /// Plain hostnames and `http://` origins never match.
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.domains
            .iter()
            .any(|domain| origin.eq_ignore_ascii_case(&format!("https://{domain}")))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentSettings {
    /// Subject of the relayed message
    #[serde(default)]
    pub subject: String,

    /// Submitted fields copied into the message body, in order
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmationSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Submitted field holding the submitter's address
    #[serde(default)]
    pub rcpt_field: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyToSettings {
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Require STARTTLS instead of using it opportunistically
    #[serde(default)]
    pub force_tls: bool,

    /// Skip delivery and answer with canned responses
    #[serde(default)]
    pub dry_run: bool,
}

fn default_smtp_port() -> u16 {
    25
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationSettings {
    #[serde(default)]
    pub disable_submission_speed_check: bool,

    #[serde(default)]
    pub random_anti_spam_field: bool,

    #[serde(default)]
    pub fields: Vec<ValidationField>,

    /// Field that must stay empty
    #[serde(default)]
    pub honeypot: Option<String>,

    #[serde(default)]
    pub hcaptcha: CaptchaSecret,

    #[serde(default)]
    pub recaptcha: CaptchaSecret,

    #[serde(default)]
    pub turnstile: CaptchaSecret,

    #[serde(default)]
    pub private_captcha: PrivateCaptchaSettings,
}

impl ValidationSettings {
    /// Honeypot field name, if one is configured and non-empty
    pub fn honeypot_field(&self) -> Option<&str> {
        self.honeypot.as_deref().filter(|name| !name.is_empty())
    }
}

/// Credentials for a siteverify-style captcha provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptchaSecret {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrivateCaptchaSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Verification host, queried as `https://{host}/verify`
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub api_key: String,
}

/// A declared validation rule for one submitted field
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationField {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    /// Type tag: text, email, number, bool, or matchval
    #[serde(default, rename = "type")]
    pub field_type: String,

    /// Literal compared against by `matchval`
    #[serde(default)]
    pub value: Option<String>,
}

impl ValidationField {
    pub fn kind(&self) -> FieldKind {
        FieldKind::parse(&self.field_type)
    }
}

/// Shape checks applied to a submitted value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// No shape check
    Text,
    /// Mailbox address
    Email,
    /// Signed 64-bit integer
    Number,
    /// true/false/0/1/on/off
    Bool,
    /// Case-insensitive match against a configured literal
    MatchValue,
}

impl FieldKind {
    /// Parse a type tag; unknown tags are treated as free text
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "number" => Self::Number,
            "bool" => Self::Bool,
            "matchval" => Self::MatchValue,
            _ => Self::Text,
        }
    }
}

/// Server-generated field that the client must echo back verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomField {
    pub name: String,
    pub value: String,
}

/// Body of a successful token request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Hex-encoded token; also the final path segment of `url`
    pub token: String,

    pub form_id: String,

    /// Issue time (Unix epoch seconds)
    pub create_time: i64,

    /// Business expiry (Unix epoch seconds)
    pub expire_time: i64,

    /// Where to POST the submission
    pub url: String,

    pub encoding: String,

    pub request_method: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_field: Option<RandomField>,
}

/// Body of a successful submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub form_id: String,

    /// Delivery time (Unix epoch seconds)
    pub sent_at: i64,

    pub confirmation_sent: bool,

    pub confirmation_response: String,

    pub message_response: String,
}

/// Envelope around every successful response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    pub status_code: u16,
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(status_code: u16, status: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            status_code,
            status: status.into(),
            message: message.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Error envelope for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub status_code: u16,
    pub status: String,
    pub message: String,
    pub errors: Vec<String>,
}
