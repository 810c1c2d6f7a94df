// Domain Error Types

use crate::domain::job::Phase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: Phase, to: Phase },

    #[error("unknown job: {0}")]
    UnknownJob(i64),

    #[error("invalid parameter: {0}")]
    ParameterError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
