//! Honeypot and random-field gates.
//!
//! Both gates are independent; either one tripping rejects the submission
//! with the same response as an invalid token.

use mailgate_common::RandomField;

use super::Submission;

/// True if any field named like the honeypot (any case) carries a value
pub fn trips_honeypot(honeypot: &str, submission: &Submission) -> bool {
    submission
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(honeypot))
        .any(|(_, values)| values.iter().any(|v| !v.is_empty()))
}

/// True if the issued random field was not echoed back verbatim
pub fn misses_random_field(expected: &RandomField, submission: &Submission) -> bool {
    submission.first(&expected.name) != Some(expected.value.as_str())
}
