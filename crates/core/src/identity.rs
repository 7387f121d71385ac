use serde::{Deserialize, Serialize};

/// User resolved from the remote identity service.
///
/// Never cached across rows: a batch can run for minutes and the remote
/// directory may change underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    email: String,
    user_id: String,
}

impl UserIdentity {
    /// Creates a user identity from a resolved directory entry.
    #[must_use]
    pub fn new(email: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            user_id: user_id.into(),
        }
    }

    /// Returns the email the user was resolved from.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the opaque identifier assigned by the identity service.
    ///
    /// Only for building bindings and debug diagnostics; user-facing output
    /// should surface the email instead.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }
}
