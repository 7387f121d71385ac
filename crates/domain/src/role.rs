use std::fmt::{Display, Formatter};

use rolebind_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Role assigned when the caller does not pick one.
pub const DEFAULT_ROLE: &str = "project-owner";

const STANDARD_ROLES: &[&str] = &[
    "project-viewer",
    "project-editor",
    "project-admin",
    "project-owner",
    "organization-admin",
    "organization-user",
    "organization-integrations-user",
    "organization-responder",
    "organization-viewer",
    "viewer-status-page-manager",
];

const ORGANIZATION_PREFIX: &str = "organization-";

/// Organization-wide roles that predate the `organization-` naming convention.
const LEGACY_ORGANIZATION_ROLES: &[&str] = &["viewer-status-page-manager"];

/// Scope a role binding applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    /// The binding references one project.
    Project,
    /// The binding applies account-wide. One per user.
    Organization,
}

impl RoleScope {
    /// Returns a stable label for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Organization => "organization",
        }
    }
}

/// Role identifier drawn from a [`RoleCatalog`].
///
/// Only obtainable through [`RoleCatalog::parse`], so every value is a member
/// of the fixed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(&'static str);

impl RoleId {
    /// Returns the wire value of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0)
    }
}

/// Immutable table of assignable roles and the rule that scopes them.
///
/// A role is organization-scoped when it starts with the organization prefix
/// or is listed as a legacy organization role; every other role is
/// project-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: &'static [&'static str],
    organization_prefix: &'static str,
    organization_exceptions: &'static [&'static str],
}

impl RoleCatalog {
    /// Creates a catalog from a fixed role table.
    #[must_use]
    pub const fn new(
        roles: &'static [&'static str],
        organization_prefix: &'static str,
        organization_exceptions: &'static [&'static str],
    ) -> Self {
        Self {
            roles,
            organization_prefix,
            organization_exceptions,
        }
    }

    /// Returns the catalog of roles offered by the remote RBAC service.
    #[must_use]
    pub const fn standard() -> Self {
        Self::new(
            STANDARD_ROLES,
            ORGANIZATION_PREFIX,
            LEGACY_ORGANIZATION_ROLES,
        )
    }

    /// Parses a transport value into a role of this catalog.
    pub fn parse(&self, value: &str) -> AppResult<RoleId> {
        let value = value.trim();
        self.roles
            .iter()
            .copied()
            .find(|role| *role == value)
            .map(RoleId)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "invalid role '{value}', must be one of: {}",
                    self.describe_roles()
                ))
            })
    }

    /// Classifies a role as project-scoped or organization-scoped.
    #[must_use]
    pub fn classify(&self, role: RoleId) -> RoleScope {
        let name = role.as_str();
        if name.starts_with(self.organization_prefix)
            || self.organization_exceptions.contains(&name)
        {
            RoleScope::Organization
        } else {
            RoleScope::Project
        }
    }

    /// Returns every role in catalog order.
    #[must_use]
    pub fn roles(&self) -> &'static [&'static str] {
        self.roles
    }

    /// Returns the roles as a comma separated list for help and error text.
    #[must_use]
    pub fn describe_roles(&self) -> String {
        self.roles.join(", ")
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
