// Maps AppError to the UWS plain-text error body format (spec §6, §7), ported
// verbatim in shape from `original_source/uws/errors.py`'s three exception
// handlers and from the teacher's `api-rpc/src/error.rs` mapping-module idiom.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uws_core::error::AppError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 422 — bad parameters, bad phase transition, malformed request.
    #[error("{0}")]
    Usage(String),

    /// 403 — caller is not the job's owner, or attempted an unsupported
    /// operation (ABORT).
    #[error("permission denied")]
    Authorization,

    /// 404 — no such job, or the job did not fail (e.g. `/error` on a
    /// non-ERROR job).
    #[error("{0}")]
    NotFound(String),

    /// 500 — store/queue/signing unavailable.
    #[error("{0}")]
    Internal(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::PermissionDenied => ApiError::Authorization,
            AppError::UnknownJob(id) => ApiError::NotFound(format!("Job {id} not found")),
            AppError::InvalidPhase(msg) => ApiError::Usage(msg),
            AppError::ParameterError(msg) => ApiError::Usage(msg),
            AppError::Domain(e) => ApiError::Usage(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Usage(detail) => (StatusCode::UNPROCESSABLE_ENTITY, format!("UsageError\n\n{detail}")),
            ApiError::Authorization => (StatusCode::FORBIDDEN, "AuthorizationError".to_string()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, format!("UsageError\n\n{detail}")),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error\n\n{detail}"))
            }
        };
        (status, [("content-type", "text/plain")], body).into_response()
    }
}
