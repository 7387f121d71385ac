//! Bulk assignment files.
//!
//! A file needs a header row with a project column (`project name`, or the
//! legacy `project-name`) and a `user email` column, matched case-insensitively,
//! plus at least one data row.

use std::fs;
use std::io::Read;
use std::path::Path;

use rolebind_core::{AppError, AppResult};
use rolebind_domain::AssignmentRow;
use tracing::{debug, warn};

const PROJECT_HEADERS: [&str; 2] = ["project name", "project-name"];
const EMAIL_HEADER: &str = "user email";

/// Fails fast when the path cannot possibly hold an assignment file.
pub fn preflight_csv_file(path: &Path) -> AppResult<()> {
    let metadata = fs::metadata(path).map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::Configuration(format!("CSV file does not exist: {}", path.display()))
        }
        _ => AppError::Configuration(format!(
            "CSV file inaccessible: {}: {error}",
            path.display()
        )),
    })?;

    if metadata.is_dir() {
        return Err(AppError::Configuration(format!(
            "CSV path is a directory, not a file: {}",
            path.display()
        )));
    }

    if metadata.len() == 0 {
        return Err(AppError::Configuration(format!(
            "CSV file is empty: {}",
            path.display()
        )));
    }

    fs::File::open(path).map_err(|error| {
        AppError::Configuration(format!(
            "CSV file not readable: {}: {error}",
            path.display()
        ))
    })?;

    Ok(())
}

/// Reads assignment rows from a file on disk.
pub fn read_assignment_rows(path: &Path) -> AppResult<Vec<AssignmentRow>> {
    let file = fs::File::open(path).map_err(|error| {
        AppError::Configuration(format!("cannot open CSV file {}: {error}", path.display()))
    })?;

    let rows = parse_assignment_rows(file)?;
    debug!(path = %path.display(), rows = rows.len(), "parsed assignment file");
    Ok(rows)
}

/// Parses assignment rows in file order.
///
/// Rows with both columns blank are dropped silently; rows too short to
/// reach both columns are dropped with a warning.
pub fn parse_assignment_rows<R: Read>(input: R) -> AppResult<Vec<AssignmentRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|error| AppError::Configuration(format!("cannot read CSV header: {error}")))?
        .clone();

    let mut project_index = None;
    let mut email_index = None;
    for (index, header) in headers.iter().enumerate() {
        let normalized = header.trim_start_matches('\u{feff}').trim().to_lowercase();
        if PROJECT_HEADERS.contains(&normalized.as_str()) {
            project_index = Some(index);
        } else if normalized == EMAIL_HEADER {
            email_index = Some(index);
        }
    }

    let (Some(project_index), Some(email_index)) = (project_index, email_index) else {
        return Err(AppError::Configuration(
            "CSV file must contain 'project name' and 'user email' columns".to_owned(),
        ));
    };

    let mut records = 0_usize;
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let record = record.map_err(|error| {
            AppError::Configuration(format!("cannot read CSV row {line}: {error}"))
        })?;
        records += 1;

        let (Some(project_name), Some(user_email)) =
            (record.get(project_index), record.get(email_index))
        else {
            warn!(row = line, "row has insufficient columns, skipping");
            continue;
        };

        let row = AssignmentRow::new(project_name, user_email);
        if !row.is_blank() {
            rows.push(row);
        }
    }

    if records == 0 {
        return Err(AppError::Configuration(
            "CSV file must have at least a header row and one data row".to_owned(),
        ));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rolebind_core::AppError;
    use rolebind_domain::AssignmentRow;

    use super::{parse_assignment_rows, preflight_csv_file, read_assignment_rows};

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file =
            tempfile::NamedTempFile::new().unwrap_or_else(|error| panic!("temp file: {error}"));
        file.write_all(contents.as_bytes())
            .unwrap_or_else(|error| panic!("write temp file: {error}"));
        file
    }

    fn configuration_message<T: std::fmt::Debug>(result: Result<T, AppError>) -> String {
        match result {
            Err(AppError::Configuration(message)) => message,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn rows_are_read_in_order_with_trimmed_values() {
        let file = write_file(
            "Project Name,User Email,Notes\n p1 , u1@x.com ,first\np2,u2@x.com,\n,badrow,\n",
        );

        let rows = read_assignment_rows(file.path());

        assert_eq!(
            rows,
            Ok(vec![
                AssignmentRow::new("p1", "u1@x.com"),
                AssignmentRow::new("p2", "u2@x.com"),
                AssignmentRow::new("", "badrow"),
            ])
        );
    }

    #[test]
    fn legacy_header_and_bom_are_accepted() {
        let rows = parse_assignment_rows("\u{feff}user email,project-name\nu@x.com,alpha\n".as_bytes());

        assert_eq!(rows, Ok(vec![AssignmentRow::new("alpha", "u@x.com")]));
    }

    #[test]
    fn blank_and_short_rows_are_skipped() {
        let rows = parse_assignment_rows(
            "note,project name,user email\n,,\nonly-note\nx,alpha,a@x.com\n".as_bytes(),
        );

        assert_eq!(rows, Ok(vec![AssignmentRow::new("alpha", "a@x.com")]));
    }

    #[test]
    fn missing_columns_are_fatal() {
        let message =
            configuration_message(parse_assignment_rows("project,email\na,b\n".as_bytes()));

        assert!(message.contains("'project name' and 'user email'"));
    }

    #[test]
    fn header_without_data_is_fatal() {
        let message =
            configuration_message(parse_assignment_rows("project name,user email\n".as_bytes()));

        assert!(message.contains("at least a header row and one data row"));
    }

    #[test]
    fn preflight_rejects_missing_empty_and_directory_paths() {
        let directory = tempfile::tempdir().unwrap_or_else(|error| panic!("temp dir: {error}"));
        let missing = directory.path().join("missing.csv");
        let empty = write_file("");

        assert!(configuration_message(preflight_csv_file(&missing)).contains("does not exist"));
        assert!(
            configuration_message(preflight_csv_file(directory.path())).contains("is a directory")
        );
        assert!(configuration_message(preflight_csv_file(empty.path())).contains("is empty"));
        assert_eq!(
            preflight_csv_file(write_file("project name,user email\n").path()),
            Ok(())
        );
    }
}
