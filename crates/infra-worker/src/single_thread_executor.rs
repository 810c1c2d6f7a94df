// Single-thread compute isolator (spec §5: "pool size 1 per worker instance").
//
// Adapted from the subprocess executor's spawn/timeout/join shape (the
// process-spawning and signal machinery is dropped — BackendAdapter's compute
// function is an in-process Rust closure, not an external process).

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, warn};
use uws_core::domain::{JobParameter, JobResult};
use uws_core::port::compute_backend::{ComputeBackend, JobInfo, WorkerError};
use uws_core::port::ComputeExecutor;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A dedicated OS thread that runs one compute call at a time, serializing
/// CPU-bound, non-thread-safe compute code away from the async I/O loop.
pub struct SingleThreadExecutor {
    sender: std_mpsc::Sender<Job>,
}

impl SingleThreadExecutor {
    pub fn new() -> Self {
        let (sender, receiver) = std_mpsc::channel::<Job>();
        std::thread::Builder::new()
            .name("uws-compute".into())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .expect("failed to spawn compute thread");
        Self { sender }
    }
}

impl Default for SingleThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComputeExecutor for SingleThreadExecutor {
    async fn run(
        &self,
        backend: Arc<dyn ComputeBackend>,
        params: Vec<JobParameter>,
        info: JobInfo,
        timeout: Option<Duration>,
    ) -> std::result::Result<Vec<JobResult>, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| backend.execute(&params, &info)));
            let result = match outcome {
                Ok(r) => r,
                Err(panic) => {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "compute function panicked".to_string());
                    error!(panic_msg = %msg, "compute function panicked");
                    Err(WorkerError::fatal(msg))
                }
            };
            let _ = reply_tx.send(result);
        });

        if self.sender.send(job).is_err() {
            return Err(WorkerError::transient("compute thread unavailable"));
        }

        match timeout {
            Some(d) => match tokio::time::timeout(d, reply_rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(WorkerError::transient("compute thread dropped reply")),
                Err(_) => {
                    warn!(?d, "compute function exceeded execution_duration");
                    Err(WorkerError::transient("execution timed out"))
                }
            },
            None => reply_rx
                .await
                .map_err(|_| WorkerError::transient("compute thread dropped reply"))?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uws_core::domain::JobParameter as Param;

    struct OkBackend;
    impl ComputeBackend for OkBackend {
        fn execute(&self, _: &[Param], _: &JobInfo) -> std::result::Result<Vec<JobResult>, WorkerError> {
            Ok(vec![])
        }
    }

    struct PanicBackend;
    impl ComputeBackend for PanicBackend {
        fn execute(&self, _: &[Param], _: &JobInfo) -> std::result::Result<Vec<JobResult>, WorkerError> {
            panic!("boom");
        }
    }

    struct SlowBackend;
    impl ComputeBackend for SlowBackend {
        fn execute(&self, _: &[Param], _: &JobInfo) -> std::result::Result<Vec<JobResult>, WorkerError> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(vec![])
        }
    }

    fn info() -> JobInfo {
        JobInfo { job_id: 1, run_id: None }
    }

    #[tokio::test]
    async fn runs_compute_and_returns_results() {
        let executor = SingleThreadExecutor::new();
        let result = executor.run(Arc::new(OkBackend), vec![], info(), None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn panics_are_isolated_as_fatal() {
        let executor = SingleThreadExecutor::new();
        let result = executor.run(Arc::new(PanicBackend), vec![], info(), None).await;
        assert!(matches!(result, Err(WorkerError::Fatal { .. })));
    }

    #[tokio::test]
    async fn exceeding_timeout_is_transient() {
        let executor = SingleThreadExecutor::new();
        let result = executor
            .run(Arc::new(SlowBackend), vec![], info(), Some(Duration::from_millis(10)))
            .await;
        assert!(matches!(result, Err(WorkerError::Transient { .. })));
    }
}
