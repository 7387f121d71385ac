//! Shared primitives for all rolebind crates.

#![forbid(unsafe_code)]

/// Identity primitives shared across layers.
pub mod identity;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use identity::UserIdentity;

/// Result type used across rolebind crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Closed set of error kinds produced while assigning role bindings.
///
/// Retry decisions switch on the kind, never on message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Malformed input or binding shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// A project-scoped role was requested without a project.
    #[error("project required: {0}")]
    ProjectRequired(String),

    /// The identity service has no user with the requested email.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// The referenced project does not exist remotely.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// The user already holds the requested role in the requested scope.
    #[error("already assigned: {0}")]
    AlreadyAssigned(String),

    /// The remote service rejected the binding because one already exists.
    #[error("role binding already exists: {0}")]
    BindingConflict(String),

    /// Credentials were rejected by the remote service.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid flags, environment or local files.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network failure, timeout, rate limit or server-side error.
    #[error("transient error: {0}")]
    Transient(String),

    /// The run was interrupted or its deadline elapsed.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether another attempt of the same remote call may succeed.
    ///
    /// `Unauthorized` and `Configuration` are terminal as well: rejected
    /// credentials or a bad endpoint do not recover between attempts.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Internal(_))
    }

    /// Returns whether the remote service already holds the requested binding.
    #[must_use]
    pub fn is_already_assigned(&self) -> bool {
        matches!(self, Self::AlreadyAssigned(_) | Self::BindingConflict(_))
    }

    /// Returns whether the error is a cancellation or deadline signal.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
