//! Form definition loading.
//!
//! Forms live as one file per form id (`{id}.toml`, `.yaml`, `.yml` or
//! `.json`) inside the configured forms directory.

use std::path::PathBuf;

use mailgate_common::FormConfig;
use mailgate_common::constants::FORM_FILE_EXTENSIONS;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("form not found: {0}")]
    NotFound(String),

    #[error("invalid form id: {0}")]
    InvalidId(String),

    #[error("failed to parse form {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: config::ConfigError,
    },
}

/// Read-only, keyed source of form definitions
pub trait FormProvider: Send + Sync {
    fn load(&self, form_id: &str) -> Result<FormConfig, FormError>;
}

/// Loads forms from files in a directory
#[derive(Debug, Clone)]
pub struct FormDirectory {
    path: PathBuf,
}

impl FormDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate the definition file for `form_id`, trying extensions in order
    fn find(&self, form_id: &str) -> Option<PathBuf> {
        FORM_FILE_EXTENSIONS
            .iter()
            .map(|ext| self.path.join(format!("{form_id}.{ext}")))
            .find(|candidate| candidate.is_file())
    }
}

impl FormProvider for FormDirectory {
    fn load(&self, form_id: &str) -> Result<FormConfig, FormError> {
        if !is_valid_form_id(form_id) {
            return Err(FormError::InvalidId(form_id.to_string()));
        }

        let file = self
            .find(form_id)
            .ok_or_else(|| FormError::NotFound(form_id.to_string()))?;

        let parse_err = |source| FormError::Parse {
            id: form_id.to_string(),
            source,
        };

        config::Config::builder()
            .add_source(config::File::from(file))
            .build()
            .map_err(parse_err)?
            .try_deserialize()
            .map_err(parse_err)
    }
}

/// Form ids map straight to file names, so only a safe charset is accepted
fn is_valid_form_id(form_id: &str) -> bool {
    !form_id.is_empty()
        && !form_id.starts_with('.')
        && form_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Fixed in-memory set of forms
#[cfg(test)]
#[derive(Default)]
pub struct StaticForms(std::collections::HashMap<String, FormConfig>);

#[cfg(test)]
impl StaticForms {
    pub fn with(mut self, form: FormConfig) -> Self {
        self.0.insert(form.id.clone(), form);
        self
    }
}

#[cfg(test)]
impl FormProvider for StaticForms {
    fn load(&self, form_id: &str) -> Result<FormConfig, FormError> {
        self.0
            .get(form_id)
            .cloned()
            .ok_or_else(|| FormError::NotFound(form_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTACT_FORM_TOML: &str = r#"
id = "contact-form"
secret = "s3cr3t"
sender = "relay@example.com"
recipients = ["owner@example.com"]
domains = ["example.com"]

[content]
subject = "New contact request"
fields = ["name", "email", "message"]

[server]
host = "mail.example.com"
port = 587
dry_run = true

[validation]
honeypot = "website"

[[validation.fields]]
name = "email"
required = true
type = "email"

[validation.turnstile]
enabled = true
secret_key = "turnstile-secret"
"#;

    fn temp_forms_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mailgate-forms-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_toml_form() {
        let dir = temp_forms_dir("toml");
        std::fs::write(dir.join("contact-form.toml"), CONTACT_FORM_TOML).unwrap();

        let form = FormDirectory::new(&dir).load("contact-form").unwrap();
        assert_eq!(form.id, "contact-form");
        assert_eq!(form.domains, vec!["example.com"]);
        assert_eq!(form.server.port, 587);
        assert!(form.server.dry_run);
        assert_eq!(form.validation.honeypot_field(), Some("website"));
        assert_eq!(form.validation.fields.len(), 1);
        assert!(form.validation.turnstile.enabled);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_load_json_form() {
        let dir = temp_forms_dir("json");
        let json = serde_json::json!({
            "id": "newsletter",
            "secret": "abc",
            "sender": "relay@example.com",
            "recipients": ["owner@example.com"],
            "domains": ["example.org"],
            "server": { "host": "localhost" }
        });
        std::fs::write(dir.join("newsletter.json"), json.to_string()).unwrap();

        let form = FormDirectory::new(&dir).load("newsletter").unwrap();
        assert_eq!(form.id, "newsletter");
        assert_eq!(form.server.port, 25);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_form() {
        let dir = temp_forms_dir("missing");
        let err = FormDirectory::new(&dir).load("nope").unwrap_err();
        assert!(matches!(err, FormError::NotFound(_)));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_rejects_path_traversal() {
        let forms = FormDirectory::new("/tmp");
        for id in ["../etc/passwd", "a/b", ".hidden", ""] {
            assert!(matches!(forms.load(id), Err(FormError::InvalidId(_))), "{id}");
        }
    }

    #[test]
    fn test_invalid_definition() {
        let dir = temp_forms_dir("invalid");
        std::fs::write(dir.join("broken.toml"), "id = \"broken\"\n").unwrap();

        let err = FormDirectory::new(&dir).load("broken").unwrap_err();
        assert!(matches!(err, FormError::Parse { .. }));

        std::fs::remove_dir_all(dir).ok();
    }
}
