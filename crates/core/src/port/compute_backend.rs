// ComputeBackend Port — the application-supplied compute function BackendAdapter wraps (spec §4.5).

use crate::domain::{JobParameter, JobResult};
use thiserror::Error;

/// Classification of a compute-function failure, mirrored onto a persisted
/// `JobError` by `BackendAdapter`'s `classify`. `detail` carries the optional
/// longer explanation rendered after the message on `/jobs/{id}/error`
/// (spec §6, §8 S6).
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{message}")]
    Fatal { message: String, detail: Option<String> },
    #[error("{message}")]
    Transient { message: String, detail: Option<String> },
    #[error("{message}")]
    Usage { message: String, detail: Option<String> },
}

impl WorkerError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal { message: message.into(), detail: None }
    }

    pub fn fatal_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Fatal { message: message.into(), detail: Some(detail.into()) }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient { message: message.into(), detail: None }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage { message: message.into(), detail: None }
    }
}

/// Information about the job made available to the compute function, distinct
/// from `JobParameter`s (which are opaque strings): the job id for logging, and
/// the run id for correlation.
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub job_id: i64,
    pub run_id: Option<String>,
}

/// A pure compute function supplied by the embedding application. Invoked by
/// `BackendAdapter` on a single-thread executor so CPU-bound, non-thread-safe
/// scientific code is serialized within the worker (§5). Implementations must
/// not block on I/O other than the compute itself; they run synchronously.
pub trait ComputeBackend: Send + Sync {
    fn execute(
        &self,
        params: &[JobParameter],
        info: &JobInfo,
    ) -> std::result::Result<Vec<JobResult>, WorkerError>;
}
