// ComputeExecutor Port — runs a ComputeBackend on an isolated single-thread executor (spec §5).

use crate::domain::{JobParameter, JobResult};
use crate::port::compute_backend::{ComputeBackend, JobInfo, WorkerError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Runs `backend.execute` on a dedicated single thread (pool size 1 per worker
/// instance), so CPU-bound, non-thread-safe compute code is serialized within
/// the worker and isolated from the async I/O loop. `timeout` of `None` means
/// unlimited (`execution_duration = 0`, spec §8 boundary condition).
#[async_trait]
pub trait ComputeExecutor: Send + Sync {
    async fn run(
        &self,
        backend: Arc<dyn ComputeBackend>,
        params: Vec<JobParameter>,
        info: JobInfo,
        timeout: Option<Duration>,
    ) -> Result<Vec<JobResult>, WorkerError>;
}
