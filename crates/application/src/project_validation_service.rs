use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use rolebind_core::AppResult;
use rolebind_domain::{AssignmentRow, sanitize_name};
use tracing::info;

use crate::{CancellationToken, ProjectDirectory, RetryExecutor, RetryPolicy};

/// Checks batch project names against the remote project list before any
/// row runs.
#[derive(Clone)]
pub struct ProjectValidationService {
    directory: Arc<dyn ProjectDirectory>,
    retry_executor: RetryExecutor,
}

impl ProjectValidationService {
    /// Creates the service over the project directory port.
    #[must_use]
    pub fn new(directory: Arc<dyn ProjectDirectory>, retry_policy: RetryPolicy) -> Self {
        Self {
            directory,
            retry_executor: RetryExecutor::new(retry_policy),
        }
    }

    /// Returns the sorted, distinct project names that exist remotely neither
    /// as written nor in sanitized form.
    pub async fn find_missing_projects(
        &self,
        rows: &[AssignmentRow],
        cancellation: &CancellationToken,
    ) -> AppResult<Vec<String>> {
        let existing: HashSet<String> = self
            .retry_executor
            .execute("list projects", cancellation, || {
                self.directory.list_project_names()
            })
            .await?
            .into_iter()
            .collect();

        let missing: BTreeSet<&str> = rows
            .iter()
            .map(|row| row.project_name.as_str())
            .filter(|project| !project.is_empty())
            .filter(|project| {
                !existing.contains(*project) && !existing.contains(&sanitize_name(project))
            })
            .collect();

        info!(
            known = existing.len(),
            missing = missing.len(),
            "validated batch projects"
        );
        Ok(missing.into_iter().map(str::to_owned).collect())
    }
}
