use std::sync::Arc;

use rolebind_core::{AppResult, UserIdentity};
use rolebind_domain::{AssignmentTarget, RoleBinding, RoleScope};
use tracing::debug;

use crate::{CancellationToken, RetryExecutor, RoleBindingRepository};

/// Finds the existing binding a requested assignment is compared against.
#[derive(Clone)]
pub struct BindingLocator {
    repository: Arc<dyn RoleBindingRepository>,
    retry_executor: RetryExecutor,
}

impl BindingLocator {
    /// Creates a locator over the binding repository.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleBindingRepository>, retry_executor: RetryExecutor) -> Self {
        Self {
            repository,
            retry_executor,
        }
    }

    /// Returns the binding to reconcile against for the target, if any.
    ///
    /// Project targets always yield `None`: the remote API cannot be queried
    /// for one project binding, and duplicate project bindings are rejected
    /// server-side on apply instead.
    pub async fn locate(
        &self,
        user: &UserIdentity,
        target: &AssignmentTarget,
        cancellation: &CancellationToken,
    ) -> AppResult<Option<RoleBinding>> {
        match target {
            AssignmentTarget::Organization => {
                self.find_organization_binding(user.user_id(), cancellation)
                    .await
            }
            AssignmentTarget::Project(project_name) => {
                debug!(
                    project = %project_name,
                    "project binding existence is enforced by the remote service"
                );
                Ok(None)
            }
        }
    }

    /// Scans all bindings for the user's organization-level binding.
    pub async fn find_organization_binding(
        &self,
        user_id: &str,
        cancellation: &CancellationToken,
    ) -> AppResult<Option<RoleBinding>> {
        let bindings = self
            .retry_executor
            .execute("list role bindings", cancellation, || {
                self.repository.list_role_bindings()
            })
            .await?;

        Ok(bindings.into_iter().find(|binding| {
            binding.scope() == RoleScope::Organization && binding.user_id() == user_id
        }))
    }
}
