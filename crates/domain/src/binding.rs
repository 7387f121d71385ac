//! Role binding entities and naming rules.
//!
//! Binding names follow RFC-1123 label rules: at most 63 characters of
//! lowercase letters, digits and hyphens, never starting or ending with a
//! hyphen.

use rolebind_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::RoleScope;

/// Maximum binding name length accepted by the remote service.
pub const BINDING_NAME_MAX_LENGTH: usize = 63;

/// Longest uniqueness suffix [`generate_binding_name`] accepts.
pub const BINDING_SUFFIX_MAX_LENGTH: usize = 16;

const BINDING_NAME_PREFIX: &str = "rb";
const ORGANIZATION_SEGMENT: &str = "org";

/// Validated role binding name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingName(String);

impl BindingName {
    /// Creates a validated binding name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();

        if value.is_empty() {
            return Err(AppError::Validation(
                "role binding name must not be empty".to_owned(),
            ));
        }

        if value.len() > BINDING_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "role binding name '{value}' exceeds {BINDING_NAME_MAX_LENGTH} characters"
            )));
        }

        if !value.chars().all(is_name_char) {
            return Err(AppError::Validation(format!(
                "role binding name '{value}' may only contain lowercase letters, digits and hyphens"
            )));
        }

        if value.starts_with('-') || value.ends_with('-') {
            return Err(AppError::Validation(format!(
                "role binding name '{value}' must not start or end with a hyphen"
            )));
        }

        Ok(Self(value))
    }

    /// Wraps a name the remote service already stores.
    ///
    /// Only emptiness is checked: bindings created elsewhere may use names
    /// outside the slug rules and still have to be matched and updated.
    pub fn existing(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "role binding name must not be empty".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the validated name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<BindingName> for String {
    fn from(value: BindingName) -> Self {
        value.0
    }
}

impl std::fmt::Display for BindingName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

fn is_name_char(character: char) -> bool {
    character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-'
}

/// Lowercases a value, collapses every run of characters outside
/// `[a-z0-9-]` into one hyphen and trims hyphens from both ends.
#[must_use]
pub fn sanitize_name(value: &str) -> String {
    let mut sanitized = String::with_capacity(value.len());
    let mut in_invalid_run = false;

    for character in value.chars().flat_map(char::to_lowercase) {
        if is_name_char(character) {
            sanitized.push(character);
            in_invalid_run = false;
        } else if !in_invalid_run {
            sanitized.push('-');
            in_invalid_run = true;
        }
    }

    sanitized.trim_matches('-').to_owned()
}

/// Formats the low 32 bits of a nanosecond timestamp as eight hex digits.
#[must_use]
pub fn binding_suffix(timestamp_nanos: i64) -> String {
    format!("{:08x}", timestamp_nanos & 0xffff_ffff)
}

/// Builds `rb-<project>-<email>-<suffix>` or `rb-org-<email>-<suffix>`.
///
/// When the result would exceed [`BINDING_NAME_MAX_LENGTH`] the email segment
/// is shortened first, then the project segment. The suffix is never cut.
pub fn generate_binding_name(
    user_email: &str,
    project_name: Option<&str>,
    suffix: &str,
) -> AppResult<BindingName> {
    let suffix = sanitize_name(suffix);
    if suffix.is_empty() || suffix.len() > BINDING_SUFFIX_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "role binding suffix must be 1 to {BINDING_SUFFIX_MAX_LENGTH} name characters"
        )));
    }

    let email = sanitize_name(user_email);
    let scope = match project_name {
        Some(project_name) => sanitize_name(project_name),
        None => ORGANIZATION_SEGMENT.to_owned(),
    };

    let budget = BINDING_NAME_MAX_LENGTH - suffix.len() - 1;
    let mut prefix = join_segments(&[BINDING_NAME_PREFIX, scope.as_str(), email.as_str()]);

    if prefix.len() > budget {
        let overflow = prefix.len() - budget;
        let email = truncate_segment(email.as_str(), email.len().saturating_sub(overflow));
        prefix = join_segments(&[BINDING_NAME_PREFIX, scope.as_str(), email]);
    }

    if prefix.len() > budget {
        prefix = truncate_segment(prefix.as_str(), budget).to_owned();
    }

    BindingName::new(format!("{prefix}-{suffix}"))
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

// Sanitized segments are ASCII, so byte offsets are char boundaries.
fn truncate_segment(segment: &str, length: usize) -> &str {
    segment[..length.min(segment.len())].trim_end_matches('-')
}

/// Assignment of a role to a user, optionally scoped to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    name: BindingName,
    role_ref: String,
    user_id: String,
    project_ref: Option<String>,
}

impl RoleBinding {
    /// Creates a binding from its parts. An empty project reference means
    /// the binding is organization-scoped.
    #[must_use]
    pub fn new(
        name: BindingName,
        role_ref: impl Into<String>,
        user_id: impl Into<String>,
        project_ref: Option<String>,
    ) -> Self {
        Self {
            name,
            role_ref: role_ref.into(),
            user_id: user_id.into(),
            project_ref: project_ref.filter(|project_ref| !project_ref.trim().is_empty()),
        }
    }

    /// Creates an organization-scoped binding.
    #[must_use]
    pub fn organization(
        name: BindingName,
        role_ref: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::new(name, role_ref, user_id, None)
    }

    /// Creates a project-scoped binding.
    #[must_use]
    pub fn project(
        name: BindingName,
        role_ref: impl Into<String>,
        user_id: impl Into<String>,
        project_ref: impl Into<String>,
    ) -> Self {
        Self::new(name, role_ref, user_id, Some(project_ref.into()))
    }

    /// Returns the same binding pointing at another role. The name is kept.
    #[must_use]
    pub fn with_role_ref(self, role_ref: impl Into<String>) -> Self {
        Self {
            role_ref: role_ref.into(),
            ..self
        }
    }

    /// Returns the binding name.
    #[must_use]
    pub fn name(&self) -> &BindingName {
        &self.name
    }

    /// Returns the referenced role.
    #[must_use]
    pub fn role_ref(&self) -> &str {
        self.role_ref.as_str()
    }

    /// Returns the bound user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the referenced project, if any.
    #[must_use]
    pub fn project_ref(&self) -> Option<&str> {
        self.project_ref.as_deref()
    }

    /// Returns the scope implied by the project reference.
    #[must_use]
    pub fn scope(&self) -> RoleScope {
        if self.project_ref.is_some() {
            RoleScope::Project
        } else {
            RoleScope::Organization
        }
    }
}
