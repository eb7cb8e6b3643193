//! Declared field validation.

use lettre::message::Mailbox;
use mailgate_common::{FieldKind, ValidationField};

use super::Submission;

/// Check every declared field, collecting all violations as `"name: reason"`
pub fn validate_fields(fields: &[ValidationField], submission: &Submission) -> Vec<String> {
    fields
        .iter()
        .filter_map(|field| {
            check_field(field, submission.first(&field.name).unwrap_or_default())
                .map(|reason| format!("{}: {}", field.name, reason))
        })
        .collect()
}

fn check_field(field: &ValidationField, value: &str) -> Option<&'static str> {
    if value.is_empty() {
        return field.required.then_some("required field is missing");
    }

    match field.kind() {
        FieldKind::Text => None,
        FieldKind::Email => value
            .parse::<Mailbox>()
            .is_err()
            .then_some("field is not of type email"),
        FieldKind::Number => value
            .parse::<i64>()
            .is_err()
            .then_some("field is not of type number"),
        FieldKind::Bool => parse_bool(value)
            .is_none()
            .then_some("field is not of type bool"),
        FieldKind::MatchValue => {
            let expected = field.value.as_deref().unwrap_or_default();
            (!value.eq_ignore_ascii_case(expected))
                .then_some("field does not match configured value")
        }
    }
}

/// Accepts true/false/0/1/on/off in any case
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}
