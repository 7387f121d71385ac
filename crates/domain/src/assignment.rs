//! Assignment requests and the row validator.

use rolebind_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{EmailAddress, RoleCatalog, RoleId, RoleScope};

/// One data row of a bulk assignment file, trimmed but otherwise unchecked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRow {
    /// Project column value. May be empty for organization roles.
    pub project_name: String,
    /// User email column value.
    pub user_email: String,
}

impl AssignmentRow {
    /// Creates a row from raw column values.
    #[must_use]
    pub fn new(project_name: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into().trim().to_owned(),
            user_email: user_email.into().trim().to_owned(),
        }
    }

    /// Returns whether both columns are blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.project_name.is_empty() && self.user_email.is_empty()
    }
}

/// Request to give one user one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    /// Target project; ignored for organization-scoped roles.
    pub project_name: Option<String>,
    /// Email of the user receiving the role.
    pub user_email: String,
    /// Role to assign.
    pub role: RoleId,
    /// Compute the decision without mutating remote state.
    pub dry_run: bool,
}

impl AssignmentRequest {
    /// Builds a request from a bulk row.
    #[must_use]
    pub fn from_row(row: &AssignmentRow, role: RoleId, dry_run: bool) -> Self {
        Self {
            project_name: Some(row.project_name.clone()).filter(|name| !name.is_empty()),
            user_email: row.user_email.clone(),
            role,
            dry_run,
        }
    }

    /// Returns every rule the request violates, in check order.
    #[must_use]
    pub fn violations(&self, catalog: &RoleCatalog) -> Vec<AppError> {
        let mut violations = Vec::new();

        if let Err(error) = self.target(catalog) {
            violations.push(error);
        }

        if let Err(error) = EmailAddress::new(self.user_email.as_str()) {
            violations.push(error);
        }

        violations
    }

    /// Validates the request, failing with the first violated rule.
    pub fn validate(&self, catalog: &RoleCatalog) -> AppResult<ValidatedAssignment> {
        let target = self.target(catalog)?;
        let email = EmailAddress::new(self.user_email.as_str())?;

        Ok(ValidatedAssignment {
            email,
            role: self.role,
            target,
            dry_run: self.dry_run,
        })
    }

    fn target(&self, catalog: &RoleCatalog) -> AppResult<AssignmentTarget> {
        match catalog.classify(self.role) {
            RoleScope::Organization => Ok(AssignmentTarget::Organization),
            RoleScope::Project => self
                .project_name
                .as_deref()
                .and_then(|project_name| NonEmptyString::new(project_name).ok())
                .map(AssignmentTarget::Project)
                .ok_or_else(|| {
                    AppError::ProjectRequired(format!(
                        "project-level role '{}' requires a project name",
                        self.role
                    ))
                }),
        }
    }
}

/// Where a validated assignment lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentTarget {
    /// The user's single organization-level binding.
    Organization,
    /// A binding scoped to the named project.
    Project(NonEmptyString),
}

impl AssignmentTarget {
    /// Returns the scope of this target.
    #[must_use]
    pub fn scope(&self) -> RoleScope {
        match self {
            Self::Organization => RoleScope::Organization,
            Self::Project(_) => RoleScope::Project,
        }
    }

    /// Returns the project name for project targets.
    #[must_use]
    pub fn project_name(&self) -> Option<&str> {
        match self {
            Self::Organization => None,
            Self::Project(project_name) => Some(project_name.as_str()),
        }
    }

    /// Returns the label used in reports: the project name or `organization`.
    #[must_use]
    pub fn label(&self) -> &str {
        self.project_name()
            .unwrap_or(RoleScope::Organization.as_str())
    }
}

/// Assignment that passed row validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAssignment {
    email: EmailAddress,
    role: RoleId,
    target: AssignmentTarget,
    dry_run: bool,
}

impl ValidatedAssignment {
    /// Returns the user email.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the requested role.
    #[must_use]
    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Returns the target scope.
    #[must_use]
    pub fn target(&self) -> &AssignmentTarget {
        &self.target
    }

    /// Returns whether the assignment must not mutate remote state.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(project: Option<&str>, email: &str, role: &str) -> AssignmentRequest {
        let catalog = RoleCatalog::standard();
        let role = catalog
            .parse(role)
            .unwrap_or_else(|error| panic!("test role: {error}"));
        AssignmentRequest {
            project_name: project.map(str::to_owned),
            user_email: email.to_owned(),
            role,
            dry_run: false,
        }
    }

    #[test]
    fn project_role_requires_project() {
        let result = request(None, "a@b.com", "project-viewer").validate(&RoleCatalog::standard());
        assert!(matches!(result, Err(AppError::ProjectRequired(_))));

        let blank = request(Some("  "), "a@b.com", "project-viewer")
            .validate(&RoleCatalog::standard());
        assert!(matches!(blank, Err(AppError::ProjectRequired(_))));
    }

    #[test]
    fn organization_role_ignores_project() {
        let result = request(Some("acme"), "a@b.com", "organization-admin")
            .validate(&RoleCatalog::standard());
        assert_eq!(
            result.map(|assignment| assignment.target().clone()),
            Ok(AssignmentTarget::Organization)
        );
    }

    #[test]
    fn empty_and_malformed_emails_are_rejected() {
        let catalog = RoleCatalog::standard();
        assert!(matches!(
            request(Some("acme"), "", "project-viewer").validate(&catalog),
            Err(AppError::Validation(message)) if message.contains("empty")
        ));
        assert!(matches!(
            request(Some("acme"), "badrow", "project-viewer").validate(&catalog),
            Err(AppError::Validation(message)) if message.contains("invalid email")
        ));
    }

    #[test]
    fn project_rule_is_reported_first() {
        let result = request(None, "badrow", "project-owner").validate(&RoleCatalog::standard());
        assert!(matches!(result, Err(AppError::ProjectRequired(_))));
    }

    #[test]
    fn violations_lists_every_broken_rule() {
        let violations = request(None, "badrow", "project-owner").violations(&RoleCatalog::standard());
        assert_eq!(violations.len(), 2);
        assert!(request(Some("acme"), "a@b.com", "project-owner")
            .violations(&RoleCatalog::standard())
            .is_empty());
    }

    #[test]
    fn valid_project_request_keeps_fields() {
        let assignment = request(Some(" acme "), "a@b.com", "project-viewer")
            .validate(&RoleCatalog::standard());
        assert!(assignment.is_ok());
        if let Ok(assignment) = assignment {
            assert_eq!(assignment.email().as_str(), "a@b.com");
            assert_eq!(assignment.role().as_str(), "project-viewer");
            assert_eq!(assignment.target().project_name(), Some("acme"));
            assert_eq!(assignment.target().label(), "acme");
            assert!(!assignment.dry_run());
        }
    }

    #[test]
    fn rows_are_trimmed_and_blank_rows_detected() {
        let row = AssignmentRow::new("  p1 ", " u1@x.com ");
        assert_eq!(row.project_name, "p1");
        assert_eq!(row.user_email, "u1@x.com");
        assert!(AssignmentRow::new(" ", "").is_blank());

        let request = AssignmentRequest::from_row(
            &AssignmentRow::new("", "u@x.com"),
            RoleCatalog::standard()
                .parse("organization-admin")
                .unwrap_or_else(|error| panic!("test role: {error}")),
            true,
        );
        assert_eq!(request.project_name, None);
        assert!(request.dry_run);
    }
}
