//! Email validation for assignment rows.

use std::sync::LazyLock;

use regex::Regex;
use rolebind_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Local part, `@`, dotted domain and an alphabetic TLD of at least two letters.
static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"));

/// Validated email address.
///
/// Case is preserved; the identity service matches emails case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address from trimmed input.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let pattern = EMAIL_PATTERN.as_ref().map_err(|error| {
            AppError::Internal(format!("email pattern failed to compile: {error}"))
        })?;
        if !pattern.is_match(trimmed) {
            return Err(AppError::Validation(format!(
                "invalid email format '{trimmed}'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}
