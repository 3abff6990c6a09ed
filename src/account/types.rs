//! Account and address types for Suimail.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::SuimailError;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Address validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Not exactly one `@`.
    #[error("address must contain exactly one '@'")]
    InvalidFormat,

    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters or starts/ends with a dot.
    #[error("username can only contain letters, digits and inner dots")]
    UsernameInvalidChars,

    /// Suffix is not the service domain.
    #[error("address must end with @{0}")]
    WrongDomain(String),
}

impl From<AddressError> for SuimailError {
    fn from(e: AddressError) -> Self {
        SuimailError::Validation(e.to_string())
    }
}

/// A validated `<username>@<domain>` address, normalised to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse and validate an address against the service domain.
    pub fn parse(s: &str, domain: &str) -> Result<Self, AddressError> {
        let mut parts = s.split('@');
        let (Some(username), Some(suffix), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AddressError::InvalidFormat);
        };

        validate_username(username)?;

        if !suffix.eq_ignore_ascii_case(domain) {
            return Err(AddressError::WrongDomain(domain.to_string()));
        }

        Ok(Self(format!(
            "{}@{}",
            username.to_ascii_lowercase(),
            domain.to_ascii_lowercase()
        )))
    }

    /// Build an address from a username and domain.
    pub fn from_parts(username: &str, domain: &str) -> Result<Self, AddressError> {
        Self::parse(&format!("{username}@{domain}"), domain)
    }

    /// Get the full address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the username part.
    pub fn username(&self) -> &str {
        self.0.split_once('@').map(|(u, _)| u).unwrap_or(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate the username part of an address.
///
/// Rules:
/// - Length between 3 and 20 characters
/// - ASCII letters and digits, with dots allowed only between them
pub fn validate_username(username: &str) -> Result<(), AddressError> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(AddressError::UsernameTooShort);
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(AddressError::UsernameTooLong);
    }

    let bytes = username.as_bytes();
    let edges_ok = bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric();
    let body_ok = bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'.');
    if !edges_ok || !body_ok {
        return Err(AddressError::UsernameInvalidChars);
    }

    Ok(())
}

/// An account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Account ID.
    pub id: i64,
    /// Namespace address.
    pub address: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
