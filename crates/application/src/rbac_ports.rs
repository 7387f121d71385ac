use async_trait::async_trait;

use rolebind_core::{AppResult, UserIdentity};
use rolebind_domain::{EmailAddress, RoleBinding};

/// Port for resolving users in the remote identity service.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolves an email into the user's stable identifier.
    ///
    /// Fails with `AppError::UserNotFound` when the directory has no such
    /// user and with `AppError::Transient` when the service could not be
    /// reached.
    async fn resolve_user(&self, email: &EmailAddress) -> AppResult<UserIdentity>;
}

/// Port for reading and writing role bindings in the remote RBAC service.
#[async_trait]
pub trait RoleBindingRepository: Send + Sync {
    /// Lists every role binding across all projects and the organization.
    ///
    /// The remote API has no per-user query, so callers scan the result.
    async fn list_role_bindings(&self) -> AppResult<Vec<RoleBinding>>;

    /// Creates the binding, or replaces the binding with the same name.
    ///
    /// Fails with `AppError::BindingConflict` when the service already holds
    /// an equivalent binding, `AppError::ProjectNotFound` when the project
    /// reference is unknown and `AppError::Validation` when the binding is
    /// malformed.
    async fn apply_binding(&self, binding: &RoleBinding) -> AppResult<()>;
}

/// Port for listing projects known to the remote service.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Lists the names of all projects.
    async fn list_project_names(&self) -> AppResult<Vec<String>>;
}
