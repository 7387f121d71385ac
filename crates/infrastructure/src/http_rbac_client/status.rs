//! Translation of HTTP failures into error kinds.

use reqwest::StatusCode;
use rolebind_core::AppError;

const MAX_BODY_CHARS: usize = 200;

/// Maps a non-success status of any endpoint to an error kind.
pub(crate) fn classify_status(status: StatusCode, operation: &str, body: &str) -> AppError {
    let detail = format!("{operation} returned {status}: {}", excerpt(body));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => AppError::Transient(detail),
        status if status.is_server_error() => AppError::Transient(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(detail),
        _ => AppError::Internal(detail),
    }
}

/// Maps a failed apply to an error kind, recognizing conflicts and unknown
/// projects by status or by the error body.
pub(crate) fn classify_apply_failure(
    status: StatusCode,
    binding_name: &str,
    project_ref: Option<&str>,
    body: &str,
) -> AppError {
    let lowered = body.to_lowercase();
    let client_error = status.is_client_error()
        && !matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS
        );

    if status == StatusCode::CONFLICT || (client_error && lowered.contains("already exists")) {
        return AppError::BindingConflict(binding_name.to_owned());
    }

    let names_missing_project = lowered.contains("project") && lowered.contains("not found");
    if status == StatusCode::NOT_FOUND || (client_error && names_missing_project) {
        return AppError::ProjectNotFound(project_ref.unwrap_or(binding_name).to_owned());
    }

    classify_status(status, "apply role binding", body)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_CHARS {
        return trimmed.to_owned();
    }

    let mut cut: String = trimmed.chars().take(MAX_BODY_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use rolebind_core::AppError;

    use super::{classify_apply_failure, classify_status};

    #[test]
    fn status_classes_map_to_error_kinds() {
        let kind = |status| classify_status(status, "list users", "");

        assert!(matches!(kind(StatusCode::UNAUTHORIZED), AppError::Unauthorized(_)));
        assert!(matches!(kind(StatusCode::FORBIDDEN), AppError::Unauthorized(_)));
        assert!(matches!(kind(StatusCode::TOO_MANY_REQUESTS), AppError::Transient(_)));
        assert!(matches!(kind(StatusCode::REQUEST_TIMEOUT), AppError::Transient(_)));
        assert!(matches!(kind(StatusCode::BAD_GATEWAY), AppError::Transient(_)));
        assert!(matches!(kind(StatusCode::BAD_REQUEST), AppError::Validation(_)));
        assert!(matches!(kind(StatusCode::IM_A_TEAPOT), AppError::Internal(_)));
    }

    #[test]
    fn apply_conflicts_are_recognized_by_status_or_body() {
        assert_eq!(
            classify_apply_failure(StatusCode::CONFLICT, "rb-a", Some("alpha"), ""),
            AppError::BindingConflict("rb-a".to_owned())
        );
        assert_eq!(
            classify_apply_failure(
                StatusCode::BAD_REQUEST,
                "rb-a",
                Some("alpha"),
                "RoleBinding for user already exists"
            ),
            AppError::BindingConflict("rb-a".to_owned())
        );
    }

    #[test]
    fn apply_missing_project_is_recognized_by_status_or_body() {
        assert_eq!(
            classify_apply_failure(StatusCode::NOT_FOUND, "rb-a", Some("alpha"), ""),
            AppError::ProjectNotFound("alpha".to_owned())
        );
        assert_eq!(
            classify_apply_failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                "rb-a",
                Some("alpha"),
                "Project alpha not found"
            ),
            AppError::ProjectNotFound("alpha".to_owned())
        );
    }

    #[test]
    fn other_apply_failures_fall_back_to_status() {
        assert!(matches!(
            classify_apply_failure(StatusCode::BAD_REQUEST, "rb-a", None, "roleRef invalid"),
            AppError::Validation(_)
        ));
        assert!(matches!(
            classify_apply_failure(
                StatusCode::SERVICE_UNAVAILABLE,
                "rb-a",
                None,
                "already exists"
            ),
            AppError::Transient(_)
        ));
        assert!(matches!(
            classify_apply_failure(StatusCode::FORBIDDEN, "rb-a", None, "project not found"),
            AppError::Unauthorized(_)
        ));
    }
}
