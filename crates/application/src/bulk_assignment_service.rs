//! Sequential batch orchestration over assignment rows.

use std::time::Duration;

use rolebind_core::{AppError, AppResult};
use rolebind_domain::{AssignmentRequest, AssignmentRow, RoleCatalog, RoleId};
use tracing::{info, warn};

use crate::{BindingDecision, CancellationToken, ProcessingStats, RoleAssignmentService, RowOutcome};

/// Per-run settings for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkAssignmentOptions {
    /// Role assigned to every row.
    pub role: RoleId,
    /// Preview decisions without mutating remote state.
    pub dry_run: bool,
    /// Pause after each successful mutation.
    pub delay: Duration,
}

/// Result of a single-user run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleAssignmentRun {
    /// Outcome of the row, absent when the run was cancelled first.
    pub outcome: Option<RowOutcome>,
    /// Stats over the single row.
    pub stats: ProcessingStats,
}

impl SingleAssignmentRun {
    /// Returns whether the user ends up holding the role.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            Some(RowOutcome::Assigned(_) | RowOutcome::AlreadyAssigned { .. })
        )
    }
}

/// Application service that drives rows through validation and assignment.
///
/// Rows run strictly one at a time in input order. Every row lands in exactly
/// one stats bucket; cancellation stops the batch and keeps partial stats.
#[derive(Clone)]
pub struct BulkAssignmentService {
    catalog: RoleCatalog,
    assignment_service: RoleAssignmentService,
}

impl BulkAssignmentService {
    /// Creates a batch service.
    #[must_use]
    pub fn new(catalog: RoleCatalog, assignment_service: RoleAssignmentService) -> Self {
        Self {
            catalog,
            assignment_service,
        }
    }

    /// Processes every row and returns the accumulated stats.
    pub async fn run_rows(
        &self,
        rows: &[AssignmentRow],
        options: &BulkAssignmentOptions,
        cancellation: &CancellationToken,
    ) -> ProcessingStats {
        let mut stats = ProcessingStats::new(rows.len(), options.dry_run);
        info!(
            rows = rows.len(),
            role = %options.role,
            dry_run = options.dry_run,
            "processing assignment rows"
        );

        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 1;
            let request = AssignmentRequest::from_row(row, options.role, options.dry_run);

            let outcome = match self.process_row(row_number, &request, cancellation).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(row = row_number, error = %error, "batch stopped");
                    stats.mark_cancelled();
                    break;
                }
            };
            stats.record(row_number, &outcome);

            let mutated = matches!(&outcome, RowOutcome::Assigned(decision) if decision.is_mutation());
            let more_rows = row_number < rows.len();
            if mutated && more_rows && !options.dry_run && !options.delay.is_zero()
                && let Err(error) = cancellation.sleep(options.delay).await
            {
                warn!(row = row_number, error = %error, "batch stopped during throttle delay");
                stats.mark_cancelled();
                break;
            }
        }

        stats
    }

    /// Runs the same pipeline for one request.
    pub async fn run_single(
        &self,
        request: &AssignmentRequest,
        cancellation: &CancellationToken,
    ) -> SingleAssignmentRun {
        let mut stats = ProcessingStats::new(1, request.dry_run);

        match self.process_row(1, request, cancellation).await {
            Ok(outcome) => {
                stats.record(1, &outcome);
                SingleAssignmentRun {
                    outcome: Some(outcome),
                    stats,
                }
            }
            Err(error) => {
                warn!(error = %error, "assignment stopped");
                stats.mark_cancelled();
                SingleAssignmentRun {
                    outcome: None,
                    stats,
                }
            }
        }
    }

    /// Classifies one row. Fails only when the run was cancelled.
    async fn process_row(
        &self,
        row_number: usize,
        request: &AssignmentRequest,
        cancellation: &CancellationToken,
    ) -> AppResult<RowOutcome> {
        cancellation.check()?;

        let project = request.project_name.as_deref().unwrap_or_default();
        info!(
            row = row_number,
            project = project,
            email = %request.user_email,
            "processing row"
        );

        let assignment = match request.validate(&self.catalog) {
            Ok(assignment) => assignment,
            Err(error) => {
                warn!(row = row_number, error = %error, "skipping invalid row");
                return Ok(RowOutcome::InvalidData {
                    message: error.to_string(),
                    missing_project: None,
                });
            }
        };
        let scope = assignment.target().label().to_owned();

        let error = match self.assignment_service.assign(&assignment, cancellation).await {
            Ok(result) => {
                return Ok(match result.decision {
                    BindingDecision::AlreadyAssigned => RowOutcome::AlreadyAssigned {
                        user_email: request.user_email.clone(),
                        scope,
                    },
                    decision => RowOutcome::Assigned(decision),
                });
            }
            Err(error) => error,
        };

        let outcome = match error {
            AppError::Cancelled(_) => return Err(error),
            error if error.is_already_assigned() => {
                info!(row = row_number, email = %request.user_email, scope = %scope, "user already has role");
                RowOutcome::AlreadyAssigned {
                    user_email: request.user_email.clone(),
                    scope,
                }
            }
            AppError::UserNotFound(_) => {
                warn!(row = row_number, email = %request.user_email, "user not found, skipping");
                RowOutcome::UserNotFound {
                    user_email: request.user_email.clone(),
                }
            }
            AppError::ProjectNotFound(_) => {
                warn!(row = row_number, project = %scope, "project not found, skipping");
                RowOutcome::InvalidData {
                    message: format!("project '{scope}' not found"),
                    missing_project: Some(scope),
                }
            }
            AppError::Validation(_) | AppError::ProjectRequired(_) => {
                warn!(row = row_number, error = %error, "binding rejected, skipping");
                RowOutcome::InvalidData {
                    message: error.to_string(),
                    missing_project: None,
                }
            }
            error => {
                warn!(row = row_number, error = %error, "failed to assign role");
                RowOutcome::Failed {
                    message: error.to_string(),
                }
            }
        };

        Ok(outcome)
    }
}

/// Collects every rule violation of every row, as `Row N: reason` lines.
///
/// Makes no remote calls.
#[must_use]
pub fn validate_rows(catalog: &RoleCatalog, rows: &[AssignmentRow], role: RoleId) -> Vec<String> {
    rows.iter()
        .enumerate()
        .flat_map(|(index, row)| {
            AssignmentRequest::from_row(row, role, true)
                .violations(catalog)
                .into_iter()
                .map(move |error| format!("Row {}: {error}", index + 1))
        })
        .collect()
}
