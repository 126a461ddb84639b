//! Form layer: binding, cleaning and saving of submitted data.
//!
//! # Responsibility
//! - Turn untrusted key/value input into validated entities.
//! - Report problems per field and per form without failing the caller.
//! - Persist cleaned data through the repository layer.
//!
//! # Invariants
//! - Every field cleaner runs; errors accumulate instead of short-circuiting.
//! - Cross-field checks run when their own inputs cleaned successfully.
//! - `save` is only reached with a fully cleaned value.
//! - A successful save appends one project log entry when a project is
//!   involved.

use crate::model::project::ProjectId;
use crate::model::project_content::ProjectLog;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account_forms;
pub mod field;
pub mod project_forms;
pub mod task_forms;
pub mod task_item_forms;
pub mod wiki_forms;

pub use field::{FieldKind, FieldSpec};

/// Submitted key/value pairs of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormData {
    values: BTreeMap<String, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Validation messages keyed by field, plus form-level messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    form: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of a cleaned field and returns its value, if any.
    pub fn take<T>(&mut self, field: &str, cleaned: Result<T, String>) -> Option<T> {
        match cleaned {
            Ok(value) => Some(value),
            Err(message) => {
                self.add_field(field, message);
                None
            }
        }
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Adds a non-field error.
    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded for `field`, empty when it cleaned.
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Single-error convenience used when a save-time conflict surfaces.
    pub fn for_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_field(field, message);
        errors
    }

    pub fn for_form(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_form(message);
        errors
    }
}

impl Display for FormErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        for (field, messages) in &self.fields {
            for message in messages {
                parts.push(format!("{field}: {message}"));
            }
        }
        parts.extend(self.form.iter().cloned());
        write!(f, "{}", parts.join("; "))
    }
}

/// Failure of a form submission.
#[derive(Debug)]
pub enum FormError {
    /// Submitted data did not validate; render the messages back.
    Invalid(FormErrors),
    /// Persistence failure outside validation.
    Repo(RepoError),
    /// Password hashing backend failure.
    PasswordHash(String),
}

impl FormError {
    pub fn errors(&self) -> Option<&FormErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "invalid form: {errors}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::PasswordHash(message) => write!(f, "password hashing failed: {message}"),
        }
    }
}

impl Error for FormError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FormErrors> for FormError {
    fn from(value: FormErrors) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for FormError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::StaleVersion { .. } => {
                Self::Invalid(FormErrors::for_form(STALE_VERSION_MESSAGE))
            }
            other => Self::Repo(other),
        }
    }
}

pub type FormResult<T> = Result<T, FormError>;

pub const STALE_VERSION_MESSAGE: &str =
    "This item was changed by someone else. Reload it and try again.";

/// One write operation driven by submitted data.
pub trait Form {
    /// Fully validated input.
    type Cleaned;
    /// What a successful save returns.
    type Output;

    /// Stable name used in logs.
    fn name(&self) -> &'static str;
    fn fields(&self) -> &'static [FieldSpec];

    /// Values to pre-fill an unbound form with.
    fn initial(&self) -> FormData {
        FormData::new()
    }

    /// Validates `data`. Lookups that fail in storage return `FormError::Repo`.
    fn clean(&self, data: &FormData) -> FormResult<Self::Cleaned>;
    fn save(&self, cleaned: Self::Cleaned) -> FormResult<Self::Output>;

    /// Cleans and saves `data`, logging the outcome.
    fn submit(&self, data: &FormData) -> FormResult<Self::Output> {
        let result = self.clean(data).and_then(|cleaned| self.save(cleaned));
        match &result {
            Ok(_) => info!(
                "event=form_submit module=form status=ok form={}",
                self.name()
            ),
            Err(FormError::Invalid(errors)) => info!(
                "event=form_submit module=form status=invalid form={} error_fields={} form_errors={}",
                self.name(),
                errors.fields.len(),
                errors.form.len()
            ),
            Err(err) => warn!(
                "event=form_submit module=form status=error form={} error={err}",
                self.name()
            ),
        }
        result
    }
}

/// Runs a storage-backed check on a value that cleaned so far.
pub(crate) fn check_with<T>(
    cleaned: Result<T, String>,
    check: impl FnOnce(T) -> RepoResult<Result<T, String>>,
) -> FormResult<Result<T, String>> {
    match cleaned {
        Ok(value) => Ok(check(value)?),
        Err(message) => Ok(Err(message)),
    }
}

/// Appends the activity line written after a successful save.
pub(crate) fn record_log<R: ProjectRepository>(
    repo: &R,
    project_uuid: ProjectId,
    text: impl AsRef<str>,
) -> FormResult<()> {
    repo.append_log(&ProjectLog::new(project_uuid, text))?;
    Ok(())
}

/// Maps a UNIQUE conflict on `column` to a field error; passes other errors on.
pub(crate) fn conflict_as_field(
    err: RepoError,
    column: &str,
    field: &str,
    message: &str,
) -> FormError {
    if err.is_conflict_on(column) {
        FormError::Invalid(FormErrors::for_field(field, message))
    } else {
        FormError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{FormData, FormError, FormErrors, STALE_VERSION_MESSAGE};
    use crate::repo::RepoError;

    #[test]
    fn take_collects_field_errors() {
        let mut errors = FormErrors::new();
        let ok: Option<i32> = errors.take("a", Ok(1));
        let bad: Option<i32> = errors.take("b", Err("nope".to_string()));
        assert_eq!(ok, Some(1));
        assert_eq!(bad, None);
        assert_eq!(errors.field("b"), ["nope".to_string()]);
        assert!(errors.field("a").is_empty());
        assert!(errors.form_errors().is_empty());
    }

    #[test]
    fn errors_serialize_with_field_and_form_sections() {
        let mut errors = FormErrors::new();
        errors.add_field("name", "This field is required.");
        errors.add_form("Start date can not be greater than end date");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["fields"]["name"][0], "This field is required.");
        assert_eq!(json["form"][0], "Start date can not be greater than end date");
    }

    #[test]
    fn stale_version_becomes_form_error() {
        let err: FormError = RepoError::StaleVersion {
            entity: "task",
            number: 1,
            version_number: 1,
        }
        .into();
        let errors = err.errors().unwrap();
        assert_eq!(errors.form_errors(), [STALE_VERSION_MESSAGE.to_string()]);
    }

    #[test]
    fn form_data_round_trips_pairs() {
        let mut data = FormData::from_pairs([("a", "1")]);
        data.insert("b", "2");
        let pairs: Vec<_> = data.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
    }
}
