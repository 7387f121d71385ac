//! Role binding assignment CLI.

#![forbid(unsafe_code)]

mod cli_args;
mod cli_config;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rolebind_application::{
    BulkAssignmentOptions, BulkAssignmentService, CancellationSource, CancellationToken,
    ProcessingReport, ProjectValidationService, RetryPolicy, RoleAssignmentService, RowOutcome,
    SingleAssignmentRun, validate_rows,
};
use rolebind_core::{AppError, AppResult};
use rolebind_domain::{AssignmentRequest, RoleCatalog, RoleId, RoleScope};
use rolebind_infrastructure::{HttpRbacClient, preflight_csv_file, read_assignment_rows};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli_args::CliArgs;
use crate::cli_config::RbacConfig;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    if let Err(error) = init_tracing(args.log_file.as_deref()) {
        eprintln!("Error: {error}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            error!(error = %error, "run failed");
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> AppResult<bool> {
    let catalog = RoleCatalog::standard();
    let role = catalog.parse(args.role.as_str())?;

    if args.validate_only {
        return validate_only(&catalog, &args, role);
    }

    let config = RbacConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let rbac_client = Arc::new(HttpRbacClient::new(http_client, config.client));

    let (source, cancellation) = CancellationToken::new(Some(args.timeout));
    tokio::spawn(cancel_on_signal(source));

    let assignment_service =
        RoleAssignmentService::new(rbac_client.clone(), rbac_client.clone(), RetryPolicy::default());
    let bulk_service = BulkAssignmentService::new(catalog, assignment_service);

    if args.dry_run {
        info!("dry run mode: no changes will be made");
    }

    match (&args.csv, &args.email) {
        (Some(csv_path), _) => {
            preflight_csv_file(csv_path)?;
            let rows = read_assignment_rows(csv_path)?;

            if args.validate_projects && catalog.classify(role) == RoleScope::Project {
                let missing = ProjectValidationService::new(rbac_client, RetryPolicy::default())
                    .find_missing_projects(&rows, &cancellation)
                    .await?;
                if !missing.is_empty() {
                    error!(missing = missing.len(), "projects in the CSV file do not exist");
                    for project in &missing {
                        eprintln!("  - {project}");
                    }
                    return Ok(false);
                }
                info!("pre-flight project validation passed");
            }

            info!(csv = %csv_path.display(), role = %role, "processing bulk assignment");
            let options = BulkAssignmentOptions {
                role,
                dry_run: args.dry_run,
                delay: args.delay,
            };
            let stats = bulk_service.run_rows(&rows, &options, &cancellation).await;

            println!("\n{}", ProcessingReport::new(&stats));
            Ok(stats.exit_ok(args.strict))
        }
        (None, Some(email)) => {
            let request = AssignmentRequest {
                project_name: args.project.clone().filter(|project| !project.trim().is_empty()),
                user_email: email.clone(),
                role,
                dry_run: args.dry_run,
            };
            info!(email = %email, role = %role, "processing single user assignment");
            let run = bulk_service.run_single(&request, &cancellation).await;

            println!("{}", single_summary(&run, &request, catalog.classify(role)));
            println!("\n{}", ProcessingReport::new(&run.stats));
            Ok(run.is_success() && run.stats.exit_ok(args.strict))
        }
        (None, None) => Err(AppError::Configuration(
            "either --email or --csv must be provided".to_owned(),
        )),
    }
}

fn validate_only(catalog: &RoleCatalog, args: &CliArgs, role: RoleId) -> AppResult<bool> {
    let Some(csv_path) = args.csv.as_deref() else {
        return Err(AppError::Configuration(
            "--validate-only requires --csv".to_owned(),
        ));
    };

    preflight_csv_file(csv_path)?;
    let rows = read_assignment_rows(csv_path)?;
    let violations = validate_rows(catalog, &rows, role);

    if violations.is_empty() {
        println!("Validation passed: {} rows valid", rows.len());
        return Ok(true);
    }

    eprintln!("Validation failed ({} problems):", violations.len());
    for violation in &violations {
        eprintln!("  {violation}");
    }
    Ok(false)
}

fn single_summary(run: &SingleAssignmentRun, request: &AssignmentRequest, scope: RoleScope) -> String {
    let target = match (scope, request.project_name.as_deref()) {
        (RoleScope::Project, Some(project)) => format!("in project '{project}'"),
        _ => "at the organization level".to_owned(),
    };
    let role = request.role;
    let email = request.user_email.as_str();

    match &run.outcome {
        Some(RowOutcome::Assigned(decision)) if request.dry_run => format!(
            "Dry run: would {} binding for role '{role}' to user '{email}' {target}",
            decision.as_str()
        ),
        Some(RowOutcome::Assigned(_)) => {
            format!("Success: Assigned role '{role}' to user '{email}' {target}")
        }
        Some(RowOutcome::AlreadyAssigned { .. }) => {
            format!("Skipped: user '{email}' already has role '{role}' {target}")
        }
        Some(RowOutcome::UserNotFound { .. }) => format!("Failed: user '{email}' not found"),
        Some(RowOutcome::InvalidData { message, .. } | RowOutcome::Failed { message }) => {
            format!("Failed: {message}")
        }
        None => "Cancelled: the run was interrupted before completing".to_owned(),
    }
}

async fn cancel_on_signal(source: CancellationSource) {
    shutdown_signal().await;
    warn!("interrupt received, cancelling run");
    source.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(error) => {
            warn!(error = %error, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_tracing(log_file: Option<&Path>) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| {
                    AppError::Configuration(format!(
                        "cannot open log file {}: {error}",
                        path.display()
                    ))
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
