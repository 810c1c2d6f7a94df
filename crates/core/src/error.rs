// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type. Maps onto the four error kinds of the UWS
/// protocol (Usage, Authorization, Task, Internal) at the HTTP boundary in
/// `crates/api-http`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Usage: caller is not the job's owner.
    #[error("permission denied")]
    PermissionDenied,

    /// Usage: no such job, or job belongs to a different owner and is hidden as unknown.
    #[error("unknown job: {0}")]
    UnknownJob(i64),

    /// Usage: phase transition attempted from a phase that does not permit it.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    /// Usage: malformed or policy-rejected parameter.
    #[error("parameter error: {0}")]
    ParameterError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// Internal: job store unavailable or a guarded transition's retry was exhausted.
    #[error("store error: {0}")]
    Store(String),

    /// Internal: job queue unavailable.
    #[error("queue error: {0}")]
    Queue(String),

    /// Internal: result signing failed.
    #[error("signing error: {0}")]
    Signing(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Store(err)
    }
}
