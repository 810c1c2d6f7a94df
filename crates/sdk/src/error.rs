//! SDK Error Types

use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A non-2xx/3xx response whose body didn't start with a recognized
    /// UWS error token (spec §6 "error body format").
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// A 422 response whose body starts with `UsageError`.
    #[error("usage error: {0}")]
    Usage(String),

    /// A 403 response whose body starts with `AuthorizationError`.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// A 404 response.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed UWS XML: {0}")]
    Xml(String),

    #[error("missing Location header on create response")]
    MissingLocation,

    #[error("invalid job id in Location header: {0}")]
    InvalidJobId(String),
}
