//! Plain-text rendering of a run summary.

use std::collections::BTreeSet;
use std::fmt;

use crate::ProcessingStats;

const BANNER_WIDTH: usize = 50;
const MAX_ERROR_LINES: usize = 10;

/// Fixed-width summary of a completed run.
///
/// Detail lists are deduplicated and sorted by construction of
/// [`ProcessingStats`].
#[derive(Debug, Clone, Copy)]
pub struct ProcessingReport<'a> {
    stats: &'a ProcessingStats,
}

impl<'a> ProcessingReport<'a> {
    /// Creates a report over the given stats.
    #[must_use]
    pub fn new(stats: &'a ProcessingStats) -> Self {
        Self { stats }
    }
}

impl fmt::Display for ProcessingReport<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        let banner = "=".repeat(BANNER_WIDTH);

        writeln!(formatter, "{banner}")?;
        if stats.dry_run {
            writeln!(formatter, "PROCESSING SUMMARY (DRY RUN)")?;
        } else {
            writeln!(formatter, "PROCESSING SUMMARY")?;
        }
        writeln!(formatter, "{banner}")?;

        let assigned_label = if stats.dry_run {
            "Would be assigned:"
        } else {
            "Successfully assigned:"
        };
        let lines = [
            ("Total rows:", stats.total_rows),
            ("Processed:", stats.processed),
            (assigned_label, stats.assigned),
            ("  created:", stats.created),
            ("  updated:", stats.updated),
            ("Skipped (already assigned):", stats.skipped_already_assigned),
            ("Skipped (user not exists):", stats.skipped_user_not_exists),
            ("Skipped (invalid data):", stats.skipped_invalid_data),
            ("Failed:", stats.failed),
        ];
        for (label, value) in lines {
            writeln!(formatter, "{label:<32}{value:>8}")?;
        }

        if stats.cancelled {
            writeln!(formatter)?;
            writeln!(
                formatter,
                "Run cancelled: {} rows not processed",
                stats.unprocessed()
            )?;
        }

        if !stats.errors.is_empty() {
            writeln!(formatter)?;
            writeln!(formatter, "Errors encountered ({}):", stats.errors.len())?;
            for (index, error) in stats.errors.iter().take(MAX_ERROR_LINES).enumerate() {
                writeln!(formatter, "  {}. {error}", index + 1)?;
            }
            if stats.errors.len() > MAX_ERROR_LINES {
                writeln!(
                    formatter,
                    "  ... and {} more errors",
                    stats.errors.len() - MAX_ERROR_LINES
                )?;
            }
        }

        write_list(formatter, "Users not found", &stats.missing_users)?;
        write_list(
            formatter,
            "Projects not found or invalid",
            &stats.missing_projects,
        )?;
        write_list(
            formatter,
            "Already assigned (unique user -> scope pairs)",
            &stats.already_assigned,
        )?;

        Ok(())
    }
}

fn write_list<T: fmt::Display>(
    formatter: &mut fmt::Formatter<'_>,
    title: &str,
    items: &BTreeSet<T>,
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }

    writeln!(formatter)?;
    writeln!(formatter, "{title} ({}):", items.len())?;
    for item in items {
        writeln!(formatter, "  - {item}")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ProcessingReport;
    use crate::{ProcessingStats, RowOutcome};

    #[test]
    fn summary_lines_are_fixed_width() {
        let stats = ProcessingStats::new(3, false);
        let rendered = ProcessingReport::new(&stats).to_string();

        assert!(rendered.starts_with(&"=".repeat(50)));
        assert!(rendered.contains("PROCESSING SUMMARY\n"));
        let total = rendered
            .lines()
            .find(|line| line.starts_with("Total rows:"))
            .unwrap_or_else(|| panic!("missing total line in {rendered}"));
        assert_eq!(total.len(), 40);
        assert!(total.ends_with("       3"));
        assert!(!rendered.contains("Errors encountered"));
    }

    #[test]
    fn errors_are_capped_at_ten_lines() {
        let mut stats = ProcessingStats::new(12, false);
        for row in 1..=12 {
            stats.record(
                row,
                &RowOutcome::Failed {
                    message: format!("failure {row}"),
                },
            );
        }

        let rendered = ProcessingReport::new(&stats).to_string();

        assert!(rendered.contains("Errors encountered (12):"));
        assert!(rendered.contains("  10. Row 10: failure 10"));
        assert!(!rendered.contains("Row 11: failure 11"));
        assert!(rendered.contains("  ... and 2 more errors"));
    }

    #[test]
    fn detail_lists_are_unique_and_sorted() {
        let mut stats = ProcessingStats::new(4, true);
        for (row, email) in [(1, "zed@x.com"), (2, "amy@x.com"), (3, "zed@x.com")] {
            stats.record(
                row,
                &RowOutcome::UserNotFound {
                    user_email: email.to_owned(),
                },
            );
        }
        stats.record(
            4,
            &RowOutcome::AlreadyAssigned {
                user_email: "bob@x.com".to_owned(),
                scope: "alpha".to_owned(),
            },
        );
        stats.mark_cancelled();

        let rendered = ProcessingReport::new(&stats).to_string();

        assert!(rendered.contains("PROCESSING SUMMARY (DRY RUN)"));
        assert!(rendered.contains("Users not found (2):\n  - amy@x.com\n  - zed@x.com\n"));
        assert!(rendered.contains("  - bob@x.com -> alpha"));
        assert!(rendered.contains("Run cancelled: 0 rows not processed"));
    }
}
