//! Shared fixtures for unit and router tests.

use std::sync::Arc;

use mailgate_common::FormConfig;

use crate::config::AppConfig;
use crate::forms::StaticForms;
use crate::state::AppState;

/// Dry-run contact form allowing `https://example.com`
pub fn contact_form() -> FormConfig {
    serde_json::from_value(serde_json::json!({
        "id": "contact-form",
        "secret": "s3cr3t",
        "sender": "relay@example.com",
        "recipients": ["owner@example.com"],
        "domains": ["example.com"],
        "content": {
            "subject": "New contact request",
            "fields": ["name", "email", "message"]
        },
        "server": { "host": "localhost", "dry_run": true },
        "validation": {
            "honeypot": "website",
            "fields": [
                { "name": "email", "required": true, "type": "email" },
                { "name": "message", "required": true, "type": "text" }
            ]
        }
    }))
    .expect("contact form fixture")
}

/// Application state over in-memory forms
pub fn app_state(forms: StaticForms, min_submission_secs: u64) -> AppState {
    let mut config = AppConfig::default();
    config.forms.min_submission_secs = min_submission_secs;
    AppState::new(config, Arc::new(forms)).expect("test state")
}
