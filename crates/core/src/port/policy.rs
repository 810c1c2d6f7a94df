// Policy Port — embedding-application collaborator (spec §4.6).

use crate::domain::{Job, JobParameter};
use crate::error::Result;
use async_trait::async_trait;

/// Polymorphic collaborator supplied by the embedding application. The engine
/// never names a concrete provider; dispatch owns the mapping from generic
/// `JobParameter`s to the backend's typed payload.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Validate parameters at job creation; raise `AppError::ParameterError` on failure.
    async fn validate_params(&self, parameters: &[JobParameter]) -> Result<()>;

    /// Construct the backend-specific payload for `job` and enqueue it on `work`
    /// with `job_timeout = job.execution_duration` seconds, returning the message id.
    async fn dispatch(&self, job: &Job, access_token: &str) -> Result<String>;

    /// Validate a requested destruction-time change, returning the value actually
    /// stored. Default behavior (when the embedder has no opinion) is to reject the
    /// change and return the job's current value.
    fn validate_destruction(&self, requested: i64, job: &Job) -> i64 {
        let _ = requested;
        job.destruction_time
    }

    /// Validate a requested execution-duration change. Default rejects the change.
    fn validate_execution_duration(&self, requested: i64, job: &Job) -> i64 {
        let _ = requested;
        job.execution_duration
    }
}
