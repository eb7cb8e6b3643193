//! Third-party captcha verification.
//!
//! Each enabled provider verifies the solution the browser widget placed
//! in a provider-specific form field. Providers are a closed set selected
//! by the form's configuration flags.

mod verifier;

pub use verifier::{CaptchaEndpoints, CaptchaVerifier};

use mailgate_common::ValidationSettings;
use mailgate_common::constants::captcha::{
    HCAPTCHA_FIELD, PRIVATE_CAPTCHA_FIELD, RECAPTCHA_FIELD, TURNSTILE_FIELD,
};

/// Supported captcha providers, in verification order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaProvider {
    PrivateCaptcha,
    HCaptcha,
    Turnstile,
    ReCaptcha,
}

impl CaptchaProvider {
    pub const ALL: [CaptchaProvider; 4] = [
        Self::PrivateCaptcha,
        Self::HCaptcha,
        Self::Turnstile,
        Self::ReCaptcha,
    ];

    /// Submitted field carrying this provider's solution
    pub fn solution_field(&self) -> &'static str {
        match self {
            Self::PrivateCaptcha => PRIVATE_CAPTCHA_FIELD,
            Self::HCaptcha => HCAPTCHA_FIELD,
            Self::Turnstile => TURNSTILE_FIELD,
            Self::ReCaptcha => RECAPTCHA_FIELD,
        }
    }

    pub fn is_enabled(&self, settings: &ValidationSettings) -> bool {
        match self {
            Self::PrivateCaptcha => settings.private_captcha.enabled,
            Self::HCaptcha => settings.hcaptcha.enabled,
            Self::Turnstile => settings.turnstile.enabled,
            Self::ReCaptcha => settings.recaptcha.enabled,
        }
    }

    /// Providers the form turned on
    pub fn enabled(settings: &ValidationSettings) -> impl Iterator<Item = CaptchaProvider> + '_ {
        Self::ALL.into_iter().filter(|p| p.is_enabled(settings))
    }
}

impl std::fmt::Display for CaptchaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PrivateCaptcha => "Private Captcha",
            Self::HCaptcha => "hCaptcha",
            Self::Turnstile => "Turnstile",
            Self::ReCaptcha => "reCAPTCHA",
        };
        f.write_str(name)
    }
}
