// JobStore Port — sole source of truth for job state (spec §4.1).

use crate::domain::{Job, JobDescription, JobError, JobId, JobParameter, JobResult, Phase};
use crate::error::Result;
use async_trait::async_trait;

/// Availability status surfaced at `/availability` (VOSI).
#[derive(Debug, Clone)]
pub struct Availability {
    pub available: bool,
    pub note: Option<String>,
}

/// Filters accepted by `JobStore::list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub owner: String,
    pub phases: Option<Vec<Phase>>,
    pub after: Option<i64>,
    pub count: Option<usize>,
}

/// The durable store for jobs, their parameters, their results, and their errors.
///
/// Implementations must serialize the guarded transitions (`mark_queued`,
/// `mark_executing`) against concurrent writers to the same row so that the
/// terminal phase always wins regardless of delivery order (I4): re-read the
/// row inside a transaction, apply the phase guard, commit, and on a
/// serialization conflict retry the whole transaction exactly once before
/// surfacing `AppError::Store`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in PENDING with `creation_time = now` and
    /// `destruction_time = now + lifetime`.
    async fn add(
        &self,
        owner: &str,
        run_id: Option<String>,
        parameters: Vec<JobParameter>,
        execution_duration: i64,
        lifetime_secs: i64,
    ) -> Result<Job>;

    /// Fails with `AppError::UnknownJob` if missing.
    async fn get(&self, job_id: JobId) -> Result<Job>;

    /// Descending creation_time; descriptions omit parameters/results.
    async fn list(&self, filter: ListFilter) -> Result<Vec<JobDescription>>;

    /// Cascades parameters and results.
    async fn delete(&self, job_id: JobId) -> Result<()>;

    /// Guarded by current phase in {PENDING, HELD}; no-op (returns Ok) if the
    /// guard fails because a terminal write has already landed.
    async fn mark_queued(&self, job_id: JobId, message_id: String) -> Result<()>;

    /// Guarded by current phase in {PENDING, QUEUED}.
    async fn mark_executing(&self, job_id: JobId, start_time: i64) -> Result<()>;

    /// Unconditional terminal write (I2, I4).
    async fn mark_completed(&self, job_id: JobId, results: Vec<JobResult>) -> Result<()>;

    /// Unconditional terminal write (I3, I4).
    async fn mark_failed(&self, job_id: JobId, error: JobError) -> Result<()>;

    async fn update_destruction(&self, job_id: JobId, destruction_time: i64) -> Result<()>;

    async fn update_execution_duration(&self, job_id: JobId, execution_duration: i64) -> Result<()>;

    /// Delete every job with `destruction_time <= now` (scheduled expiration, §4.5).
    async fn expire_jobs(&self, now: i64) -> Result<u64>;

    async fn availability(&self) -> Availability;
}
