//! SMTP dispatch of relayed submissions.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use mailgate_common::constants::DRY_RUN_RESPONSE;
use mailgate_common::{FormConfig, SmtpSettings};
use thiserror::Error;

use crate::submission::Submission;

const BODY_PREAMBLE: &str = "The following form fields have been transmitted:\n\n";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("field {0:?} is configured but was not submitted")]
    MissingField(String),
}

/// SMTP server responses for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Present when a confirmation mail went out
    pub confirmation_response: Option<String>,
    pub message_response: String,
}

/// Sends the relayed message, and the optional confirmation, per form
pub struct Mailer {
    timeout: Duration,
    user_agent: String,
}

impl Mailer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: format!("mailgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Deliver a validated submission.
    ///
    /// The confirmation goes out first; a failure there aborts the main message.
    pub async fn dispatch(&self, form: &FormConfig, submission: &Submission) -> Result<Delivery, MailError> {
        if form.server.dry_run {
            tracing::info!(form_id = %form.id, "Dry-run enabled, skipping mail delivery");
            return Ok(Delivery {
                confirmation_response: form
                    .confirmation
                    .enabled
                    .then(|| DRY_RUN_RESPONSE.to_string()),
                message_response: DRY_RUN_RESPONSE.to_string(),
            });
        }

        let transport = self.transport(&form.server)?;

        let confirmation_response = if form.confirmation.enabled {
            let confirmation = self.build_confirmation(form, submission)?;
            let response = transport.send(confirmation).await?;
            tracing::debug!(form_id = %form.id, "Confirmation mail sent");
            Some(describe(&response))
        } else {
            None
        };

        let message = self.build_message(form, submission)?;
        let response = transport.send(message).await?;

        Ok(Delivery {
            confirmation_response,
            message_response: describe(&response),
        })
    }

    fn transport(&self, server: &SmtpSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let parameters = TlsParameters::new(server.host.clone())?;
        let tls = if server.force_tls {
            Tls::Required(parameters)
        } else {
            Tls::Opportunistic(parameters)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
            .port(server.port)
            .tls(tls)
            .timeout(Some(self.timeout));

        if let (Some(username), Some(password)) = (&server.username, &server.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// Confirmation mail addressed to the submitter
    fn build_confirmation(&self, form: &FormConfig, submission: &Submission) -> Result<Message, MailError> {
        let field = &form.confirmation.rcpt_field;
        let recipient = submission
            .first(field)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MailError::MissingField(field.clone()))?;

        let message = Message::builder()
            .from(mailbox(&form.sender)?)
            .to(mailbox(recipient)?)
            .subject(form.confirmation.subject.as_str())
            .user_agent(self.user_agent.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(form.confirmation.content.clone())?;

        Ok(message)
    }

    /// Relayed message addressed to the form's recipients
    fn build_message(&self, form: &FormConfig, submission: &Submission) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(mailbox(&form.sender)?)
            .subject(form.content.subject.as_str())
            .user_agent(self.user_agent.clone())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &form.recipients {
            builder = builder.to(mailbox(recipient)?);
        }

        if let Some(field) = form.reply_to.field.as_deref().filter(|f| !f.is_empty()) {
            let reply_to = submission
                .first(field)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MailError::MissingField(field.to_string()))?;
            builder = builder.reply_to(mailbox(reply_to)?);
        }

        Ok(builder.body(message_body(&form.content.fields, submission))?)
    }
}

/// Plain-text listing of the configured fields that carry a value
fn message_body(fields: &[String], submission: &Submission) -> String {
    let mut body = String::from(BODY_PREAMBLE);
    for field in fields {
        if let Some(value) = submission.first(field).filter(|v| !v.is_empty()) {
            body.push_str(&format!("* {field} => {value}\n"));
        }
    }
    body
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// `"250 2.0.0 Ok: queued"`
fn describe(response: &Response) -> String {
    let lines: Vec<String> = response.message().map(str::to_string).collect();
    format!("{} {}", response.code(), lines.join(" "))
}
