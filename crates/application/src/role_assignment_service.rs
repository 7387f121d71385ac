//! Binding reconciliation for a single assignment.
//!
//! Each call walks resolve user → locate existing binding → decide → apply,
//! with every remote call wrapped in the retry executor.

use std::sync::Arc;

use chrono::Utc;
use rolebind_core::{AppError, AppResult, UserIdentity};
use rolebind_domain::{BindingName, RoleBinding, ValidatedAssignment, binding_suffix};
use tracing::{debug, info};

use crate::{
    BindingLocator, CancellationToken, IdentityResolver, RetryExecutor, RetryPolicy,
    RoleBindingRepository,
};

mod reconcile;

pub use reconcile::{BindingPlan, plan_binding};

/// Classification of a completed assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingDecision {
    /// A new binding was (or in dry-run would be) created.
    Create {
        /// Name of the new binding.
        binding_name: BindingName,
    },
    /// The user's organization binding was (or would be) repointed.
    Update {
        /// Name of the updated binding.
        binding_name: BindingName,
        /// Role the binding granted before.
        previous_role: String,
    },
    /// Nothing to do: the user already holds the role.
    AlreadyAssigned,
}

impl BindingDecision {
    /// Returns whether the decision mutates remote state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::AlreadyAssigned)
    }

    /// Returns a stable label for logs and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::AlreadyAssigned => "skip",
        }
    }
}

/// Result of one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentResult {
    /// What was decided.
    pub decision: BindingDecision,
    /// Whether the decision was only previewed.
    pub dry_run: bool,
}

/// Application service that reconciles one role assignment.
#[derive(Clone)]
pub struct RoleAssignmentService {
    identity_resolver: Arc<dyn IdentityResolver>,
    binding_repository: Arc<dyn RoleBindingRepository>,
    binding_locator: BindingLocator,
    retry_executor: RetryExecutor,
}

impl RoleAssignmentService {
    /// Creates an assignment service over the remote ports.
    #[must_use]
    pub fn new(
        identity_resolver: Arc<dyn IdentityResolver>,
        binding_repository: Arc<dyn RoleBindingRepository>,
        retry_policy: RetryPolicy,
    ) -> Self {
        let retry_executor = RetryExecutor::new(retry_policy);
        Self {
            identity_resolver,
            binding_locator: BindingLocator::new(binding_repository.clone(), retry_executor.clone()),
            binding_repository,
            retry_executor,
        }
    }

    /// Assigns the role, or previews the decision in dry-run mode.
    ///
    /// A binding conflict reported on apply is returned as
    /// [`BindingDecision::AlreadyAssigned`]. `UserNotFound`, validation and
    /// cancellation errors are returned as-is.
    pub async fn assign(
        &self,
        assignment: &ValidatedAssignment,
        cancellation: &CancellationToken,
    ) -> AppResult<AssignmentResult> {
        let user = self.resolve_user(assignment, cancellation).await?;

        let existing = self
            .binding_locator
            .locate(&user, assignment.target(), cancellation)
            .await?;
        let suffix = binding_suffix(Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let plan = plan_binding(assignment, &user, existing, suffix.as_str())?;

        let (binding, decision) = match plan {
            BindingPlan::Skip { existing } => {
                info!(
                    email = %assignment.email(),
                    role = %assignment.role(),
                    scope = %assignment.target().label(),
                    binding = %existing.name(),
                    "user already has role"
                );
                return Ok(assignment_result(assignment, BindingDecision::AlreadyAssigned));
            }
            BindingPlan::Update {
                binding,
                previous_role,
            } => {
                let decision = BindingDecision::Update {
                    binding_name: binding.name().clone(),
                    previous_role,
                };
                (binding, decision)
            }
            BindingPlan::Create { binding } => {
                let decision = BindingDecision::Create {
                    binding_name: binding.name().clone(),
                };
                (binding, decision)
            }
        };

        if assignment.dry_run() {
            info!(
                email = %assignment.email(),
                role = %assignment.role(),
                scope = %assignment.target().label(),
                action = decision.as_str(),
                binding = %binding.name(),
                "dry run: would apply role binding"
            );
            return Ok(assignment_result(assignment, decision));
        }

        match self.apply(&binding, cancellation).await {
            Ok(()) => {}
            Err(error) if error.is_already_assigned() => {
                info!(
                    email = %assignment.email(),
                    role = %assignment.role(),
                    scope = %assignment.target().label(),
                    "remote service reports binding already exists"
                );
                return Ok(assignment_result(assignment, BindingDecision::AlreadyAssigned));
            }
            Err(error) => return Err(error),
        }

        match &decision {
            BindingDecision::Update { previous_role, .. } => info!(
                email = %assignment.email(),
                binding = %binding.name(),
                from = %previous_role,
                to = %assignment.role(),
                "updated organization role binding"
            ),
            _ => info!(
                email = %assignment.email(),
                role = %assignment.role(),
                scope = %assignment.target().label(),
                binding = %binding.name(),
                "assigned role"
            ),
        }

        Ok(assignment_result(assignment, decision))
    }

    async fn resolve_user(
        &self,
        assignment: &ValidatedAssignment,
        cancellation: &CancellationToken,
    ) -> AppResult<UserIdentity> {
        let email = assignment.email();
        let user = self
            .retry_executor
            .execute("resolve user", cancellation, || {
                self.identity_resolver.resolve_user(email)
            })
            .await
            .map_err(|error| match error {
                AppError::UserNotFound(_) => {
                    AppError::UserNotFound(format!("user with email '{email}' not found"))
                }
                other => other,
            })?;

        info!(email = %email, "found user");
        debug!(email = %email, user_id = %user.user_id(), "resolved user identifier");
        Ok(user)
    }

    async fn apply(&self, binding: &RoleBinding, cancellation: &CancellationToken) -> AppResult<()> {
        debug!(
            binding = %binding.name(),
            scope = binding.scope().as_str(),
            "applying role binding"
        );
        self.retry_executor
            .execute("apply role binding", cancellation, || {
                self.binding_repository.apply_binding(binding)
            })
            .await
    }
}

fn assignment_result(
    assignment: &ValidatedAssignment,
    decision: BindingDecision,
) -> AssignmentResult {
    AssignmentResult {
        decision,
        dry_run: assignment.dry_run(),
    }
}
