//! Domain model for projects, tasks, wiki content and accounts.
//!
//! # Responsibility
//! - Define the entity structs persisted by the repository layer.
//! - Keep entity-level invariants next to the data (`validate()`).
//!
//! # Invariants
//! - Every entity is identified by a stable UUID v4.
//! - Timestamps are Unix epoch milliseconds; calendar dates are `NaiveDate`.
//! - Notes and task items point at tasks by logical number, never by row id.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account;
pub mod note;
pub mod project;
pub mod project_content;
pub mod task;
pub mod time_amount;
pub mod wiki;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid identifier regex"));

/// Returns whether `value` only holds ASCII letters, digits and underscores.
///
/// Shared by project shortnames, usernames and wiki page names.
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

/// Local calendar date, used as the default start date.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Current wall clock as epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Entity invariant violations detected before persistence or after reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    /// A required text field is blank.
    EmptyField(&'static str),
    /// A text field exceeds its maximum length in characters.
    TooLong { field: &'static str, max: usize },
    /// An identifier-style field contains characters outside `[A-Za-z0-9_]`.
    InvalidIdentifier { field: &'static str, value: String },
    /// An end date precedes its start date.
    EndBeforeStart {
        start_field: &'static str,
        end_field: &'static str,
    },
    /// Expected time must be strictly positive.
    NonPositiveTime,
    /// Actual time can not be negative.
    NegativeTime,
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be blank"),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            Self::InvalidIdentifier { field, value } => write!(
                f,
                "`{field}` must only contain letters, numbers and underscores, got `{value}`"
            ),
            Self::EndBeforeStart {
                start_field,
                end_field,
            } => write!(f, "`{end_field}` is earlier than `{start_field}`"),
            Self::NonPositiveTime => write!(f, "expected time must be greater than 0"),
            Self::NegativeTime => write!(f, "actual time must not be negative"),
        }
    }
}

impl Error for EntityValidationError {}

pub(crate) fn check_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), EntityValidationError> {
    if value.trim().is_empty() {
        return Err(EntityValidationError::EmptyField(field));
    }
    if value.chars().count() > max {
        return Err(EntityValidationError::TooLong { field, max });
    }
    Ok(())
}

pub(crate) fn check_identifier(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), EntityValidationError> {
    check_text(field, value, max)?;
    if !is_identifier(value) {
        return Err(EntityValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_identifier, is_identifier, EntityValidationError};

    #[test]
    fn identifier_accepts_ascii_word_characters_only() {
        assert!(is_identifier("alpha_01"));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier("dash-ed"));
        assert!(!is_identifier("caf\u{e9}"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn check_identifier_reports_length_before_pattern() {
        let err = check_identifier("shortname", "a_very_long_shortname_value", 20).unwrap_err();
        assert_eq!(
            err,
            EntityValidationError::TooLong {
                field: "shortname",
                max: 20
            }
        );
    }
}
