// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;

// Re-exports
pub use error::DomainError;
pub use job::{
    ErrorCode, ErrorType, Job, JobDescription, JobError, JobId, JobParameter, JobResult,
    JobResultSigned, MessageId, Phase, ACTIVE_PHASES,
};
