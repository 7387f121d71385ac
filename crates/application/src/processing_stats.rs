//! Per-run outcome counters and detail lists.

use std::collections::BTreeSet;

use crate::BindingDecision;

/// Outcome of one processed row. Each outcome lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The binding was created or updated (or would be, in dry-run).
    Assigned(BindingDecision),
    /// The user already holds the role in the target scope.
    AlreadyAssigned {
        /// Email of the row's user.
        user_email: String,
        /// Project name, or `organization`.
        scope: String,
    },
    /// The identity service has no such user.
    UserNotFound {
        /// Email of the row's user.
        user_email: String,
    },
    /// The row or the binding built from it was rejected.
    InvalidData {
        /// Human-readable reason.
        message: String,
        /// Project the remote service reported as unknown.
        missing_project: Option<String>,
    },
    /// Remote failure that outlived every retry.
    Failed {
        /// Human-readable reason.
        message: String,
    },
}

/// Unique (user, scope) pair reported as already assigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlreadyAssignedPair {
    /// Email of the user.
    pub user_email: String,
    /// Project name, or `organization`.
    pub scope: String,
}

impl std::fmt::Display for AlreadyAssignedPair {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} -> {}", self.user_email, self.scope)
    }
}

/// Counters accumulated over one run.
///
/// Invariant: `processed` equals the sum of the five outcome buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Data rows in the input.
    pub total_rows: usize,
    /// Rows that reached an outcome.
    pub processed: usize,
    /// Rows whose binding was created or updated.
    pub assigned: usize,
    /// Rows whose user already held the role.
    pub skipped_already_assigned: usize,
    /// Rows whose user does not exist.
    pub skipped_user_not_exists: usize,
    /// Rows rejected as invalid, including unknown projects.
    pub skipped_invalid_data: usize,
    /// Rows that failed after retries.
    pub failed: usize,
    /// Assigned rows that created a binding.
    pub created: usize,
    /// Assigned rows that repointed an organization binding.
    pub updated: usize,
    /// Whether mutations were only previewed.
    pub dry_run: bool,
    /// Whether the run stopped before every row was processed.
    pub cancelled: bool,
    /// Error lines in row order.
    pub errors: Vec<String>,
    /// Emails unknown to the identity service.
    pub missing_users: BTreeSet<String>,
    /// Projects unknown to the remote service.
    pub missing_projects: BTreeSet<String>,
    /// Pairs that already held the role.
    pub already_assigned: BTreeSet<AlreadyAssignedPair>,
}

impl ProcessingStats {
    /// Creates empty stats for a run over `total_rows` rows.
    #[must_use]
    pub fn new(total_rows: usize, dry_run: bool) -> Self {
        Self {
            total_rows,
            dry_run,
            ..Self::default()
        }
    }

    /// Attributes one row's outcome to its bucket.
    pub fn record(&mut self, row_number: usize, outcome: &RowOutcome) {
        self.processed += 1;

        match outcome {
            RowOutcome::Assigned(decision) => {
                self.assigned += 1;
                match decision {
                    BindingDecision::Create { .. } => self.created += 1,
                    BindingDecision::Update { .. } => self.updated += 1,
                    BindingDecision::AlreadyAssigned => {}
                }
            }
            RowOutcome::AlreadyAssigned { user_email, scope } => {
                self.skipped_already_assigned += 1;
                self.already_assigned.insert(AlreadyAssignedPair {
                    user_email: user_email.clone(),
                    scope: scope.clone(),
                });
            }
            RowOutcome::UserNotFound { user_email } => {
                self.skipped_user_not_exists += 1;
                self.missing_users.insert(user_email.clone());
                self.errors
                    .push(format!("Row {row_number}: user '{user_email}' not found"));
            }
            RowOutcome::InvalidData {
                message,
                missing_project,
            } => {
                self.skipped_invalid_data += 1;
                if let Some(project) = missing_project {
                    self.missing_projects.insert(project.clone());
                }
                self.errors.push(format!("Row {row_number}: {message}"));
            }
            RowOutcome::Failed { message } => {
                self.failed += 1;
                self.errors.push(format!("Row {row_number}: {message}"));
            }
        }
    }

    /// Marks the run as stopped early.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Returns the number of rows that never reached an outcome.
    #[must_use]
    pub fn unprocessed(&self) -> usize {
        self.total_rows.saturating_sub(self.processed)
    }

    /// Returns the number of rows in any skip bucket.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped_already_assigned + self.skipped_user_not_exists + self.skipped_invalid_data
    }

    /// Returns whether the run counts as successful for the exit code.
    ///
    /// Failures and cancellation always fail the run; skips fail it only in
    /// strict mode.
    #[must_use]
    pub fn exit_ok(&self, strict: bool) -> bool {
        if self.failed > 0 || self.cancelled {
            return false;
        }

        !(strict && self.skipped() > 0)
    }
}

#[cfg(test)]
mod tests {
    use rolebind_domain::BindingName;

    use super::{ProcessingStats, RowOutcome};
    use crate::BindingDecision;

    fn created() -> RowOutcome {
        RowOutcome::Assigned(BindingDecision::Create {
            binding_name: BindingName::new("rb-org-a-00000001")
                .unwrap_or_else(|error| panic!("test name: {error}")),
        })
    }

    #[test]
    fn every_outcome_lands_in_one_bucket() {
        let mut stats = ProcessingStats::new(5, false);
        stats.record(1, &created());
        stats.record(
            2,
            &RowOutcome::AlreadyAssigned {
                user_email: "a@x.com".to_owned(),
                scope: "organization".to_owned(),
            },
        );
        stats.record(
            3,
            &RowOutcome::UserNotFound {
                user_email: "b@x.com".to_owned(),
            },
        );
        stats.record(
            4,
            &RowOutcome::InvalidData {
                message: "project 'gone' not found".to_owned(),
                missing_project: Some("gone".to_owned()),
            },
        );
        stats.record(
            5,
            &RowOutcome::Failed {
                message: "transient error: timeout".to_owned(),
            },
        );

        let buckets = stats.assigned
            + stats.skipped_already_assigned
            + stats.skipped_user_not_exists
            + stats.skipped_invalid_data
            + stats.failed;
        assert_eq!(stats.processed, 5);
        assert_eq!(buckets, stats.processed);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.errors.len(), 3);
        assert_eq!(stats.errors[2], "Row 5: transient error: timeout");
        assert!(stats.missing_projects.contains("gone"));
    }

    #[test]
    fn exit_policy_depends_on_failures_cancellation_and_strictness() {
        let mut stats = ProcessingStats::new(2, false);
        stats.record(1, &created());
        stats.record(
            2,
            &RowOutcome::UserNotFound {
                user_email: "b@x.com".to_owned(),
            },
        );

        assert!(stats.exit_ok(false));
        assert!(!stats.exit_ok(true));

        stats.mark_cancelled();
        assert!(!stats.exit_ok(false));
    }

    #[test]
    fn failed_row_fails_the_run() {
        let mut stats = ProcessingStats::new(1, false);
        stats.record(
            1,
            &RowOutcome::Failed {
                message: "boom".to_owned(),
            },
        );

        assert!(!stats.exit_ok(false));
        assert_eq!(stats.unprocessed(), 0);
    }
}
