//! Application services and ports.

#![forbid(unsafe_code)]

mod binding_locator;
mod bulk_assignment_service;
mod cancellation;
mod processing_stats;
mod project_validation_service;
mod rbac_ports;
mod report;
mod retry_executor;
mod role_assignment_service;

#[cfg(test)]
mod test_support;

pub use binding_locator::BindingLocator;
pub use bulk_assignment_service::{
    BulkAssignmentOptions, BulkAssignmentService, SingleAssignmentRun, validate_rows,
};
pub use cancellation::{CancellationSource, CancellationToken};
pub use processing_stats::{AlreadyAssignedPair, ProcessingStats, RowOutcome};
pub use project_validation_service::ProjectValidationService;
pub use rbac_ports::{IdentityResolver, ProjectDirectory, RoleBindingRepository};
pub use report::ProcessingReport;
pub use retry_executor::{RetryExecutor, RetryPolicy};
pub use role_assignment_service::{
    AssignmentResult, BindingDecision, BindingPlan, RoleAssignmentService, plan_binding,
};
