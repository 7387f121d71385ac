use rolebind_core::{AppError, AppResult, UserIdentity};
use rolebind_domain::{
    AssignmentTarget, BindingName, RoleBinding, ValidatedAssignment, generate_binding_name,
    sanitize_name,
};
use tracing::warn;

/// Reconciliation decision for one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingPlan {
    /// The user already holds the role in the target scope.
    Skip {
        /// Binding that already grants the role.
        existing: RoleBinding,
    },
    /// Repoint the user's organization binding at the requested role.
    Update {
        /// Binding to apply. Keeps the existing name.
        binding: RoleBinding,
        /// Role the binding granted before.
        previous_role: String,
    },
    /// Create a new binding.
    Create {
        /// Binding to apply, with a freshly generated name.
        binding: RoleBinding,
    },
}

/// Decides between skip, update and create for a resolved user.
///
/// Organization targets compare against the user's single organization
/// binding. Project targets always create; a duplicate is reported by the
/// remote service on apply.
pub fn plan_binding(
    assignment: &ValidatedAssignment,
    user: &UserIdentity,
    existing: Option<RoleBinding>,
    name_suffix: &str,
) -> AppResult<BindingPlan> {
    let role = assignment.role().as_str();

    if let Some(existing) = existing {
        if existing.role_ref() == role {
            return Ok(BindingPlan::Skip { existing });
        }

        if let AssignmentTarget::Organization = assignment.target() {
            let previous_role = existing.role_ref().to_owned();
            let binding = RoleBinding::organization(existing.name().clone(), role, user.user_id());
            return Ok(BindingPlan::Update {
                binding,
                previous_role,
            });
        }
    }

    let binding = match assignment.target() {
        AssignmentTarget::Organization => RoleBinding::organization(
            new_binding_name(assignment, None, name_suffix)?,
            role,
            user.user_id(),
        ),
        AssignmentTarget::Project(project_name) => {
            let project_ref = sanitize_name(project_name.as_str());
            if project_ref.is_empty() {
                return Err(AppError::Validation(format!(
                    "project name '{project_name}' has no characters usable in a project reference"
                )));
            }
            if project_ref != project_name.as_str() {
                warn!(
                    project = %project_name,
                    project_ref = %project_ref,
                    "project name sanitized for RFC-1123 compliance"
                );
            }

            RoleBinding::project(
                new_binding_name(assignment, Some(project_name.as_str()), name_suffix)?,
                role,
                user.user_id(),
                project_ref,
            )
        }
    };

    Ok(BindingPlan::Create { binding })
}

fn new_binding_name(
    assignment: &ValidatedAssignment,
    project_name: Option<&str>,
    name_suffix: &str,
) -> AppResult<BindingName> {
    generate_binding_name(assignment.email().as_str(), project_name, name_suffix)
}
