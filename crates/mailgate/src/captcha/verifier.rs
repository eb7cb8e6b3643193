//! Captcha solution verification against provider APIs.

use std::time::Duration;

use mailgate_common::ValidationSettings;
use mailgate_common::constants::captcha::{HCAPTCHA_ENDPOINT, RECAPTCHA_ENDPOINT, TURNSTILE_ENDPOINT};
use mailgate_common::constants::headers::X_API_KEY;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::CaptchaProvider;
use crate::submission::Submission;

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("missing {0} solution")]
    MissingSolution(CaptchaProvider),

    #[error("{provider} verification request failed: {source}")]
    Transport {
        provider: CaptchaProvider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} verification returned HTTP {status}")]
    Status {
        provider: CaptchaProvider,
        status: u16,
    },

    #[error("{0} rejected the solution")]
    Rejected(CaptchaProvider),
}

impl CaptchaError {
    pub fn provider(&self) -> CaptchaProvider {
        match self {
            Self::MissingSolution(provider) | Self::Rejected(provider) => *provider,
            Self::Transport { provider, .. } | Self::Status { provider, .. } => *provider,
        }
    }
}

/// Verification endpoints of the siteverify-style providers
#[derive(Debug, Clone)]
pub struct CaptchaEndpoints {
    pub hcaptcha: String,
    pub turnstile: String,
    pub recaptcha: String,
}

impl Default for CaptchaEndpoints {
    fn default() -> Self {
        Self {
            hcaptcha: HCAPTCHA_ENDPOINT.to_string(),
            turnstile: TURNSTILE_ENDPOINT.to_string(),
            recaptcha: RECAPTCHA_ENDPOINT.to_string(),
        }
    }
}

/// Fields common to every provider's verification response
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Captcha verifier service
pub struct CaptchaVerifier {
    http: reqwest::Client,
    endpoints: CaptchaEndpoints,
}

impl CaptchaVerifier {
    pub fn new(endpoints: CaptchaEndpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mailgate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, endpoints })
    }

    /// Verify every provider the form enables; the first failure is final
    pub async fn verify_all(
        &self,
        settings: &ValidationSettings,
        submission: &Submission,
        remote_ip: Option<&str>,
    ) -> Result<(), CaptchaError> {
        for provider in CaptchaProvider::enabled(settings) {
            let solution = submission.first(provider.solution_field());
            self.verify(provider, settings, solution, remote_ip).await?;
            tracing::debug!(provider = %provider, "Captcha verification succeeded");
        }
        Ok(())
    }

    /// Verify one provider's solution. A missing solution fails without a request.
    pub async fn verify(
        &self,
        provider: CaptchaProvider,
        settings: &ValidationSettings,
        solution: Option<&str>,
        remote_ip: Option<&str>,
    ) -> Result<(), CaptchaError> {
        let solution = solution
            .filter(|s| !s.is_empty())
            .ok_or(CaptchaError::MissingSolution(provider))?;

        let request = match provider {
            CaptchaProvider::PrivateCaptcha => {
                let pc = &settings.private_captcha;
                self.http
                    .post(private_captcha_endpoint(&pc.host))
                    .header(X_API_KEY, &pc.api_key)
                    .body(solution.to_string())
            }
            CaptchaProvider::HCaptcha => {
                self.siteverify(&self.endpoints.hcaptcha, &settings.hcaptcha.secret_key, solution, remote_ip)
            }
            CaptchaProvider::Turnstile => self.siteverify(
                &self.endpoints.turnstile,
                &settings.turnstile.secret_key,
                solution,
                remote_ip,
            ),
            CaptchaProvider::ReCaptcha => self.siteverify(
                &self.endpoints.recaptcha,
                &settings.recaptcha.secret_key,
                solution,
                remote_ip,
            ),
        };

        let transport = |source| CaptchaError::Transport { provider, source };

        let response = request.send().await.map_err(transport)?;
        if response.status() != StatusCode::OK {
            return Err(CaptchaError::Status {
                provider,
                status: response.status().as_u16(),
            });
        }

        let body: VerifyResponse = response.json().await.map_err(transport)?;
        if !body.success {
            tracing::warn!(
                provider = %provider,
                error_codes = ?body.error_codes,
                "Captcha solution rejected"
            );
            return Err(CaptchaError::Rejected(provider));
        }

        Ok(())
    }

    /// url-encoded `{response, secret, remoteip}` POST
    fn siteverify(
        &self,
        endpoint: &str,
        secret: &str,
        solution: &str,
        remote_ip: Option<&str>,
    ) -> reqwest::RequestBuilder {
        self.http.post(endpoint).form(&[
            ("response", solution),
            ("secret", secret),
            ("remoteip", remote_ip.unwrap_or_default()),
        ])
    }
}

/// Private Captcha is self-hostable; a host may carry its own scheme
fn private_captcha_endpoint(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        format!("{host}/verify")
    } else {
        format!("https://{host}/verify")
    }
}
