//! Contact details collected when the backend asks for them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Shape check only: `local@domain.tld`.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("valid email regex")
});

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_CHARS: usize = 7;

/// Reason a contact form submission was rejected before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please provide a valid name (at least 2 characters).")]
    InvalidName,
    #[error("Please provide a valid email address.")]
    InvalidEmail,
    #[error("Please provide a valid phone number (at least 7 digits).")]
    InvalidPhone,
}

/// Name, email and phone as typed into the contact form.
///
/// Sent to the backend as `name=..&email=..&phone=..`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self::new(self.name.trim(), self.email.trim(), self.phone.trim())
    }

    /// Trim and validate, stopping at the first invalid field.
    ///
    /// Lengths are counted in UTF-16 code units, the way the browser form
    /// counts them, so a single emoji is two units long. The phone number is
    /// not stripped of separators, so `555-12` is six units long.
    pub fn validate(&self) -> Result<Self, ValidationError> {
        let info = self.trimmed();

        if utf16_len(&info.name) < MIN_NAME_CHARS {
            return Err(ValidationError::InvalidName);
        }
        if !EMAIL_PATTERN.is_match(&info.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if utf16_len(&info.phone) < MIN_PHONE_CHARS {
            return Err(ValidationError::InvalidPhone);
        }

        Ok(info)
    }
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
