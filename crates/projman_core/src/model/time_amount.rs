//! Fixed-point time amounts for task items.
//!
//! Values carry exactly two decimal places and at most 10 digits in total,
//! so they are stored as integer hundredths and never go through floats.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const MAX_DIGITS: usize = 10;
pub const DECIMAL_PLACES: usize = 2;

/// Decimal amount of time units with two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TimeAmount {
    hundredths: i64,
}

impl TimeAmount {
    pub const ZERO: TimeAmount = TimeAmount { hundredths: 0 };

    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self { hundredths }
    }

    pub const fn hundredths(self) -> i64 {
        self.hundredths
    }

    pub fn is_positive(self) -> bool {
        self.hundredths > 0
    }

    pub fn is_negative(self) -> bool {
        self.hundredths < 0
    }
}

/// Why a decimal string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAmountError {
    Invalid,
    TooManyDigits,
    TooManyWholeDigits,
    TooManyDecimalPlaces,
}

impl Display for TimeAmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid => write!(f, "Enter a number."),
            Self::TooManyDigits => write!(
                f,
                "Ensure that there are no more than {MAX_DIGITS} digits in total."
            ),
            Self::TooManyWholeDigits => write!(
                f,
                "Ensure that there are no more than {} digits before the decimal point.",
                MAX_DIGITS - DECIMAL_PLACES
            ),
            Self::TooManyDecimalPlaces => write!(
                f,
                "Ensure that there are no more than {DECIMAL_PLACES} decimal places."
            ),
        }
    }
}

impl Error for TimeAmountError {}

impl FromStr for TimeAmount {
    type Err = TimeAmountError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let (negative, body) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(TimeAmountError::Invalid);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(TimeAmountError::Invalid);
        }

        let whole = whole.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');
        if whole.len() + fraction.len() > MAX_DIGITS {
            return Err(TimeAmountError::TooManyDigits);
        }
        if fraction.len() > DECIMAL_PLACES {
            return Err(TimeAmountError::TooManyDecimalPlaces);
        }
        if whole.len() > MAX_DIGITS - DECIMAL_PLACES {
            return Err(TimeAmountError::TooManyWholeDigits);
        }

        let whole_value = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().map_err(|_| TimeAmountError::Invalid)?
        };
        let fraction_value = format!("{fraction:0<2}")
            .parse::<i64>()
            .map_err(|_| TimeAmountError::Invalid)?;
        let hundredths = whole_value * 100 + fraction_value;

        Ok(Self {
            hundredths: if negative { -hundredths } else { hundredths },
        })
    }
}

impl Display for TimeAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.hundredths < 0 { "-" } else { "" };
        let abs = self.hundredths.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<TimeAmount> for String {
    fn from(value: TimeAmount) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TimeAmount {
    type Error = TimeAmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Unit a task item's time is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Hours,
    Days,
    Months,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 3] = [TimeUnit::Hours, TimeUnit::Days, TimeUnit::Months];

    /// Submitted choice value, also the stored value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Months => "months",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.as_str() == value)
    }
}

#[cfg(test)]
mod tests {
    use super::{TimeAmount, TimeAmountError, TimeUnit};

    fn parse(value: &str) -> Result<TimeAmount, TimeAmountError> {
        value.parse()
    }

    #[test]
    fn parses_integers_and_two_decimal_places_exactly() {
        assert_eq!(parse("3").unwrap().hundredths(), 300);
        assert_eq!(parse("1.5").unwrap().hundredths(), 150);
        assert_eq!(parse(" 0.25 ").unwrap().hundredths(), 25);
        assert_eq!(parse(".75").unwrap().hundredths(), 75);
        assert_eq!(parse("-2.10").unwrap().hundredths(), -210);
        assert_eq!(parse("1.500").unwrap().hundredths(), 150);
    }

    #[test]
    fn rejects_malformed_and_oversized_values() {
        assert_eq!(parse(""), Err(TimeAmountError::Invalid));
        assert_eq!(parse("abc"), Err(TimeAmountError::Invalid));
        assert_eq!(parse("1.2.3"), Err(TimeAmountError::Invalid));
        assert_eq!(parse("1e3"), Err(TimeAmountError::Invalid));
        assert_eq!(parse("0.125"), Err(TimeAmountError::TooManyDecimalPlaces));
        assert_eq!(parse("123456789"), Err(TimeAmountError::TooManyWholeDigits));
        assert_eq!(parse("12345678901"), Err(TimeAmountError::TooManyDigits));
    }

    #[test]
    fn display_always_shows_two_decimals() {
        assert_eq!(TimeAmount::from_hundredths(150).to_string(), "1.50");
        assert_eq!(TimeAmount::from_hundredths(-5).to_string(), "-0.05");
        assert_eq!(TimeAmount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn units_parse_from_choice_values() {
        assert_eq!(TimeUnit::parse("days"), Some(TimeUnit::Days));
        assert_eq!(TimeUnit::parse("weeks"), None);
    }
}
