//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input string is too short.
    #[error("phone number must be at least {min} digits")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input string is too long.
    #[error("phone number must be at most {max} digits")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that is not a digit.
    #[error("phone number must contain only digits")]
    InvalidCharacter,
}

/// A phone number in the international digits-only form WhatsApp uses
/// (country code followed by the subscriber number, no `+`).
///
/// ## Constraints
///
/// - Length: 7-15 digits (E.164 limit)
/// - ASCII digits only; a single leading `+` is accepted and stripped
///
/// ## Examples
///
/// ```
/// use waba_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("201234567890").is_ok());
/// assert!(PhoneNumber::parse("+201234567890").is_ok());
/// assert!(PhoneNumber::parse("not-a-number").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

impl PhoneNumber {
    /// Parse a phone number from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneNumberError`] if the input is empty, contains
    /// non-digit characters, or is outside the E.164 length range.
    pub fn parse(input: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneNumberError::InvalidCharacter);
        }
        if digits.len() < MIN_DIGITS {
            return Err(PhoneNumberError::TooShort { min: MIN_DIGITS });
        }
        if digits.len() > MAX_DIGITS {
            return Err(PhoneNumberError::TooLong { max: MAX_DIGITS });
        }

        Ok(Self(digits.to_owned()))
    }

    /// The digits-only string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}
