use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use rolebind_domain::DEFAULT_ROLE;

/// Assign roles to users, one at a time or in bulk from a CSV file.
#[derive(Debug, Parser)]
#[command(name = "rolebind", version, about)]
#[command(group(ArgGroup::new("mode").required(true).args(["email", "csv"])))]
#[command(after_help = "CSV files need 'project name' and 'user email' columns. \
The project column may be empty for organization roles.\n\
Credentials are read from RBAC_CLIENT_ID and RBAC_CLIENT_SECRET.")]
pub struct CliArgs {
    /// Project name (required for project-level roles)
    #[arg(long)]
    pub project: Option<String>,

    /// Email of the user (single user mode)
    #[arg(long)]
    pub email: Option<String>,

    /// CSV file for bulk processing
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Role to assign
    #[arg(long, default_value = DEFAULT_ROLE)]
    pub role: String,

    /// Show what would change without applying anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only validate the CSV file; no credentials or network needed
    #[arg(long, requires = "csv", conflicts_with = "email")]
    pub validate_only: bool,

    /// Deadline for the whole run, e.g. 30s, 5m, 1h
    #[arg(long, default_value = "5m", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Pause after each successful assignment, e.g. 500ms, 1s
    #[arg(long, default_value = "500ms", value_parser = parse_duration)]
    pub delay: Duration,

    /// Also append logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Exit non-zero when any row was skipped
    #[arg(long)]
    pub strict: bool,

    /// Check that every CSV project exists before processing rows
    #[arg(long)]
    pub validate_projects: bool,
}

/// One year; longer runs and pauses are rejected.
const MAX_DURATION_SECS: u64 = 365 * 24 * 3600;

/// Parses `<number><unit>` with unit `ms`, `s`, `m` or `h`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|character: char| !character.is_ascii_digit())
        .ok_or_else(|| format!("duration '{value}' needs a unit (ms, s, m, h)"))?;
    let (amount, unit) = value.split_at(split);

    let amount = amount
        .parse::<u64>()
        .map_err(|error| format!("invalid duration '{value}': {error}"))?;

    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(amount)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(format!("invalid duration unit '{unit}' (use ms, s, m, h)")),
    };

    amount
        .checked_mul(seconds_per_unit)
        .filter(|seconds| *seconds <= MAX_DURATION_SECS)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{value}' is too large"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::{CliArgs, parse_duration};

    #[test]
    fn durations_accept_common_units() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("3d").is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert!(parse_duration("6000000000000000h").is_err());
        assert!(parse_duration("8761h").is_err());
        assert_eq!(parse_duration("8760h"), Ok(Duration::from_secs(365 * 24 * 3600)));
        assert!(
            CliArgs::try_parse_from([
                "rolebind",
                "--email",
                "a@x.com",
                "--timeout",
                "6000000000000000h",
            ])
            .is_err()
        );
    }

    #[test]
    fn defaults_apply_in_single_mode() {
        let args = CliArgs::try_parse_from(["rolebind", "--email", "a@x.com", "--project", "p"])
            .unwrap_or_else(|error| panic!("parse: {error}"));

        assert_eq!(args.role, "project-owner");
        assert_eq!(args.timeout, Duration::from_secs(300));
        assert_eq!(args.delay, Duration::from_millis(500));
        assert!(!args.dry_run);
    }

    #[test]
    fn exactly_one_mode_is_required() {
        assert!(CliArgs::try_parse_from(["rolebind"]).is_err());
        assert!(
            CliArgs::try_parse_from(["rolebind", "--email", "a@x.com", "--csv", "rows.csv"])
                .is_err()
        );
    }

    #[test]
    fn validate_only_requires_csv() {
        assert!(
            CliArgs::try_parse_from(["rolebind", "--email", "a@x.com", "--validate-only"]).is_err()
        );
        assert!(
            CliArgs::try_parse_from(["rolebind", "--csv", "rows.csv", "--validate-only"]).is_ok()
        );
    }
}
