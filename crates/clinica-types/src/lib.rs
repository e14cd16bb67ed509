//! Validated primitive text types shared across the Clinica crates.
//!
//! Every type here is a thin wrapper around `String` that can only be built through a
//! checking constructor, so holders can rely on the content being well formed.

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    #[error("national ID may only contain digits, '-' and 'K'")]
    InvalidNationalId,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("phone number must be an optional '+' followed by 8 to 15 digits")]
    InvalidPhone,
    #[error("names may only contain letters, spaces, apostrophes, hyphens and periods")]
    InvalidName,
}

fn trimmed_bounded(input: &str, max: usize) -> Result<&str, TextError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TextError::Empty);
    }
    if trimmed.chars().count() > max {
        return Err(TextError::TooLong { max });
    }
    Ok(trimmed)
}

macro_rules! text_wrapper {
    ($name:ident) => {
        impl $name {
            /// Returns the inner string as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

text_wrapper!(NonEmptyText);

/// Chilean national identifier (RUT), e.g. `11111111-1` or `7654321-K`.
///
/// Only digits, hyphens and the check letter `K` are accepted. A lowercase `k` is
/// normalised to `K` so that uniqueness checks compare like with like.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NationalId(String);

impl NationalId {
    pub const MAX_LEN: usize = 12;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = trimmed_bounded(input.as_ref(), Self::MAX_LEN)?;
        let ok = trimmed
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'-' | b'k' | b'K'));
        if !ok {
            return Err(TextError::InvalidNationalId);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

text_wrapper!(NationalId);

/// Given names or last names of a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName(String);

impl PersonName {
    pub const MAX_LEN: usize = 80;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = trimmed_bounded(input.as_ref(), Self::MAX_LEN)?;
        let ok = trimmed
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, ' ' | '\'' | '-' | '.'));
        if !ok {
            return Err(TextError::InvalidName);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

text_wrapper!(PersonName);

/// An email address, stored lowercased.
///
/// The check is structural only: one `@`, a non-empty local part and a dotted domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub const MAX_LEN: usize = 254;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = trimmed_bounded(input.as_ref(), Self::MAX_LEN)?;
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TextError::InvalidEmail);
        }

        let (local, domain) = trimmed.split_once('@').ok_or(TextError::InvalidEmail)?;
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || domain.contains("..")
        {
            return Err(TextError::InvalidEmail);
        }

        Ok(Self(trimmed.to_lowercase()))
    }
}

text_wrapper!(EmailAddress);

/// A phone number: optional leading `+` then 8 to 15 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !(8..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TextError::InvalidPhone);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

text_wrapper!(PhoneNumber);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  hola ").unwrap().as_str(), "hola");
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn national_id_accepts_rut_shapes() {
        assert_eq!(NationalId::new("11111111-1").unwrap().as_str(), "11111111-1");
        assert_eq!(NationalId::new("7654321-k").unwrap().as_str(), "7654321-K");
    }

    #[test]
    fn national_id_rejects_letters_and_long_input() {
        assert_eq!(
            NationalId::new("1234567-A"),
            Err(TextError::InvalidNationalId)
        );
        assert_eq!(
            NationalId::new("1234567890123"),
            Err(TextError::TooLong { max: 12 })
        );
    }

    #[test]
    fn person_name_allows_accents_and_rejects_digits() {
        assert!(PersonName::new("María José").is_ok());
        assert!(PersonName::new("O'Higgins-Riquelme").is_ok());
        assert_eq!(PersonName::new("R2D2"), Err(TextError::InvalidName));
        assert_eq!(
            PersonName::new("a".repeat(81)),
            Err(TextError::TooLong { max: 80 })
        );
    }

    #[test]
    fn email_is_lowercased_and_structurally_checked() {
        let email = EmailAddress::new("Doctor@SaludMaule.cl").unwrap();
        assert_eq!(email.as_str(), "doctor@saludmaule.cl");

        for bad in ["no-at-sign", "@saludmaule.cl", "a@b", "a@.cl", "a b@c.cl", "a@b@c.cl"] {
            assert_eq!(EmailAddress::new(bad), Err(TextError::InvalidEmail), "{bad}");
        }
    }

    #[test]
    fn phone_requires_8_to_15_digits() {
        assert!(PhoneNumber::new("+56911111110").is_ok());
        assert!(PhoneNumber::new("71234567").is_ok());
        assert_eq!(PhoneNumber::new("1234567"), Err(TextError::InvalidPhone));
        assert_eq!(PhoneNumber::new("+56 9 1111"), Err(TextError::InvalidPhone));
    }

    #[test]
    fn deserialize_runs_validation() {
        let ok: NationalId = serde_json::from_str("\"22222222-2\"").unwrap();
        assert_eq!(ok.as_str(), "22222222-2");
        assert!(serde_json::from_str::<NationalId>("\"abc\"").is_err());
    }
}
