//! Field declarations and per-field cleaners.
//!
//! # Invariants
//! - Submitted values are trimmed (passwords excepted); an empty value
//!   counts as missing.
//! - Cleaners return the user-facing message as `Err(String)`.

use super::FormData;
use crate::model::time_amount::TimeAmount;
use chrono::NaiveDate;
use serde::Serialize;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_DATE_MESSAGE: &str = "Enter a valid date.";

const DATE_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const FALSE_FLAG_VALUES: [&str; 5] = ["false", "0", "off", "no", "none"];

/// Input widget family of a field, with its size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Char { max_length: usize },
    Text,
    Password { max_length: usize },
    Date,
    Decimal { max_digits: usize, decimal_places: usize },
    Choice,
    Boolean,
    File,
}

/// Static description of one form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: &'static str,
}

impl FieldSpec {
    /// Required field without help text.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            help_text: "",
        }
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub const fn with_help(mut self, help_text: &'static str) -> Self {
        self.help_text = help_text;
        self
    }

    /// Submitted value, `None` when absent or blank.
    pub fn raw<'d>(&self, data: &'d FormData) -> Option<&'d str> {
        let value = data.get(self.name)?;
        let value = match self.kind {
            FieldKind::Password { .. } => value,
            _ => value.trim(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Cleans a char/text/password/file field.
    pub fn text(&self, data: &FormData) -> Result<Option<String>, String> {
        let Some(value) = self.presence(data)? else {
            return Ok(None);
        };
        let max_length = match self.kind {
            FieldKind::Char { max_length } | FieldKind::Password { max_length } => {
                Some(max_length)
            }
            _ => None,
        };
        if let Some(max_length) = max_length {
            let length = value.chars().count();
            if length > max_length {
                return Err(format!(
                    "Ensure this value has at most {max_length} characters (it has {length})."
                ));
            }
        }
        Ok(Some(value.to_string()))
    }

    /// Cleans a date field; accepts `YYYY-MM-DD` and `MM/DD/YYYY`.
    pub fn date(&self, data: &FormData) -> Result<Option<NaiveDate>, String> {
        let Some(value) = self.presence(data)? else {
            return Ok(None);
        };
        parse_date(value)
            .map(Some)
            .ok_or_else(|| INVALID_DATE_MESSAGE.to_string())
    }

    /// Cleans a decimal field into a fixed-point amount.
    pub fn amount(&self, data: &FormData) -> Result<Option<TimeAmount>, String> {
        let Some(value) = self.presence(data)? else {
            return Ok(None);
        };
        value
            .parse::<TimeAmount>()
            .map(Some)
            .map_err(|err| err.to_string())
    }

    /// Cleans a choice field against the allowed values.
    pub fn choice(&self, data: &FormData, choices: &[&str]) -> Result<Option<String>, String> {
        let Some(value) = self.presence(data)? else {
            return Ok(None);
        };
        if choices.contains(&value) {
            Ok(Some(value.to_string()))
        } else {
            Err(format!(
                "Select a valid choice. {value} is not one of the available choices."
            ))
        }
    }

    /// Checkbox semantics: absent, blank or a false-like value is `false`.
    pub fn flag(&self, data: &FormData) -> bool {
        match self.raw(data) {
            Some(value) => !FALSE_FLAG_VALUES
                .iter()
                .any(|falsy| value.eq_ignore_ascii_case(falsy)),
            None => false,
        }
    }

    fn presence<'d>(&self, data: &'d FormData) -> Result<Option<&'d str>, String> {
        match self.raw(data) {
            Some(value) => Ok(Some(value)),
            None if self.required => Err(REQUIRED_MESSAGE.to_string()),
            None => Ok(None),
        }
    }
}

/// Unwraps the value of a required field.
pub fn required<T>(cleaned: Result<Option<T>, String>) -> Result<T, String> {
    cleaned.and_then(|value| value.ok_or_else(|| REQUIRED_MESSAGE.to_string()))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::{required, FieldKind, FieldSpec, REQUIRED_MESSAGE};
    use crate::form::FormData;
    use chrono::NaiveDate;

    const NAME: FieldSpec = FieldSpec::new("name", FieldKind::Char { max_length: 5 });
    const START: FieldSpec = FieldSpec::new("start", FieldKind::Date);
    const END: FieldSpec = FieldSpec::new("end", FieldKind::Date).optional();
    const TIME: FieldSpec = FieldSpec::new(
        "time",
        FieldKind::Decimal {
            max_digits: 10,
            decimal_places: 2,
        },
    );
    const DONE: FieldSpec = FieldSpec::new("done", FieldKind::Boolean).optional();
    const SECRET: FieldSpec = FieldSpec::new("secret", FieldKind::Password { max_length: 30 });

    #[test]
    fn text_trims_and_enforces_max_length() {
        let data = FormData::from_pairs([("name", "  abc  ")]);
        assert_eq!(NAME.text(&data).unwrap().as_deref(), Some("abc"));

        let data = FormData::from_pairs([("name", "abcdefg")]);
        assert_eq!(
            NAME.text(&data).unwrap_err(),
            "Ensure this value has at most 5 characters (it has 7)."
        );
    }

    #[test]
    fn blank_required_field_is_missing() {
        let data = FormData::from_pairs([("name", "   ")]);
        assert_eq!(NAME.text(&data).unwrap_err(), REQUIRED_MESSAGE);
        assert_eq!(required(END.date(&FormData::new())).unwrap_err(), REQUIRED_MESSAGE);
        assert_eq!(END.date(&FormData::new()).unwrap(), None);
    }

    #[test]
    fn date_accepts_iso_and_us_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let iso = FormData::from_pairs([("start", "2024-03-09")]);
        let us = FormData::from_pairs([("start", "03/09/2024")]);
        assert_eq!(START.date(&iso).unwrap(), Some(expected));
        assert_eq!(START.date(&us).unwrap(), Some(expected));

        let bad = FormData::from_pairs([("start", "2024-13-40")]);
        assert_eq!(START.date(&bad).unwrap_err(), "Enter a valid date.");
    }

    #[test]
    fn amount_reports_decimal_messages() {
        let data = FormData::from_pairs([("time", "1.505")]);
        assert_eq!(
            TIME.amount(&data).unwrap_err(),
            "Ensure that there are no more than 2 decimal places."
        );
        let data = FormData::from_pairs([("time", "abc")]);
        assert_eq!(TIME.amount(&data).unwrap_err(), "Enter a number.");
        let data = FormData::from_pairs([("time", "2.5")]);
        assert_eq!(TIME.amount(&data).unwrap().unwrap().hundredths(), 250);
    }

    #[test]
    fn choice_rejects_unknown_values() {
        let field = FieldSpec::new("unit", FieldKind::Choice);
        let data = FormData::from_pairs([("unit", "weeks")]);
        assert_eq!(
            field.choice(&data, &["hours", "days"]).unwrap_err(),
            "Select a valid choice. weeks is not one of the available choices."
        );
    }

    #[test]
    fn flag_is_false_when_absent_or_falsy() {
        assert!(!DONE.flag(&FormData::new()));
        assert!(!DONE.flag(&FormData::from_pairs([("done", "off")])));
        assert!(DONE.flag(&FormData::from_pairs([("done", "on")])));
        assert!(DONE.flag(&FormData::from_pairs([("done", "true")])));
    }

    #[test]
    fn password_keeps_surrounding_whitespace() {
        let data = FormData::from_pairs([("secret", " pw ")]);
        assert_eq!(SECRET.text(&data).unwrap().as_deref(), Some(" pw "));
    }
}
