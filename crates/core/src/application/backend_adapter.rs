// BackendAdapter — wraps an application-supplied compute function (spec §4.5).

use crate::domain::{JobId, JobParameter, JobResult};
use crate::error::{AppError, Result};
use crate::port::compute_backend::{ComputeBackend, JobInfo, WorkerError};
use crate::port::job_queue::{QueueOutcome, UWS_QUEUE};
use crate::port::{ComputeExecutor, JobQueue, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

pub struct BackendAdapter {
    backend: Arc<dyn ComputeBackend>,
    executor: Arc<dyn ComputeExecutor>,
    queue: Arc<dyn JobQueue>,
    time: Arc<dyn TimeProvider>,
}

impl BackendAdapter {
    pub fn new(
        backend: Arc<dyn ComputeBackend>,
        executor: Arc<dyn ComputeExecutor>,
        queue: Arc<dyn JobQueue>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            backend,
            executor,
            queue,
            time,
        }
    }

    /// Invoked by a backend worker on a `work` message identified by `message_id`.
    /// Enqueues `job_started` before running the compute function and `job_completed`
    /// unconditionally afterward (spec §4.5 steps 1-4), even if the compute function
    /// errors. The compute outcome itself is deposited into the queue's result store
    /// under `message_id`, which is what TrackerWorker's `job_completed` handler polls.
    #[instrument(skip(self, params))]
    pub async fn run(
        &self,
        job_id: JobId,
        message_id: &str,
        params: Vec<JobParameter>,
        run_id: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let start_time = self.time.now_millis();
        self.queue
            .enqueue(
                UWS_QUEUE,
                "job_started",
                serde_json::json!({ "job_id": job_id, "start_time": start_time }),
            )
            .await?;

        let info = JobInfo { job_id, run_id };
        let outcome = self
            .executor
            .run(self.backend.clone(), params, info, timeout)
            .await;

        // `job_completed` must be enqueued even if depositing the result fails
        // (spec §4.5 step 4, "In `finally`"): otherwise the tracker never learns
        // the job finished and it is stuck in EXECUTING until destruction.
        let deposit_outcome = self.deposit_result(message_id, outcome).await;

        self.queue
            .enqueue(UWS_QUEUE, "job_completed", serde_json::json!({ "job_id": job_id }))
            .await?;

        deposit_outcome
    }

    async fn deposit_result(
        &self,
        message_id: &str,
        outcome: std::result::Result<Vec<JobResult>, WorkerError>,
    ) -> Result<()> {
        match outcome {
            Ok(results) => {
                info!(message_id, result_count = results.len(), "compute function succeeded");
                let value = serde_json::to_value(&results).map_err(AppError::from)?;
                self.queue.set_complete(message_id, QueueOutcome::Success(value)).await
            }
            Err(worker_error) => {
                let (error_type, message, detail) = classify(worker_error);
                let value = serde_json::json!({
                    "error_type": error_type,
                    "message": message,
                    "detail": detail,
                });
                self.queue.set_complete(message_id, QueueOutcome::Failure(value)).await
            }
        }
    }
}

fn classify(error: WorkerError) -> (&'static str, String, Option<String>) {
    match error {
        WorkerError::Fatal { message, detail } => ("fatal", message, detail),
        WorkerError::Transient { message, detail } => ("transient", message, detail),
        // Usage errors from a compute function are not protocol-defined elsewhere;
        // they are reported as fatal so the caller sees them rather than silently
        // retrying (there is no retry path for dispatched work, spec §1 Non-goals).
        WorkerError::Usage { message, detail } => ("fatal", message, detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::job_queue::{QueueMessage, QueueOutcome};
    use crate::port::time_provider::SystemTimeProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingQueue {
        enqueued: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl JobQueue for RecordingQueue {
        async fn enqueue(&self, queue_name: &str, task_name: &str, _args: serde_json::Value) -> Result<String> {
            self.enqueued
                .lock()
                .unwrap()
                .push((queue_name.to_string(), task_name.to_string()));
            Ok("m-1".to_string())
        }
        async fn dequeue(&self, _queue_name: &str) -> Result<Option<QueueMessage>> {
            Ok(None)
        }
        async fn get_result(&self, _message_id: &str) -> Result<Option<QueueOutcome>> {
            Ok(None)
        }
        async fn set_in_progress(&self, _message_id: &str) -> Result<()> {
            Ok(())
        }
        async fn set_complete(&self, _message_id: &str, _outcome: QueueOutcome) -> Result<()> {
            Ok(())
        }
    }

    struct EchoBackend;
    impl ComputeBackend for EchoBackend {
        fn execute(
            &self,
            _params: &[JobParameter],
            _info: &JobInfo,
        ) -> std::result::Result<Vec<JobResult>, WorkerError> {
            Ok(vec![])
        }
    }

    struct InlineExecutor;
    #[async_trait]
    impl ComputeExecutor for InlineExecutor {
        async fn run(
            &self,
            backend: Arc<dyn ComputeBackend>,
            params: Vec<JobParameter>,
            info: JobInfo,
            _timeout: Option<Duration>,
        ) -> std::result::Result<Vec<JobResult>, WorkerError> {
            backend.execute(&params, &info)
        }
    }

    #[tokio::test]
    async fn run_enqueues_job_started_then_job_completed() {
        let queue = Arc::new(RecordingQueue { enqueued: Mutex::new(vec![]) });
        let adapter = BackendAdapter::new(
            Arc::new(EchoBackend),
            Arc::new(InlineExecutor),
            queue.clone(),
            Arc::new(SystemTimeProvider),
        );

        adapter.run(1, "m-1", vec![], None, None).await.unwrap();

        let calls: Vec<String> = queue
            .enqueued
            .lock()
            .unwrap()
            .iter()
            .map(|(_, task)| task.clone())
            .collect();
        assert_eq!(calls[0], "job_started");
        assert_eq!(calls.last().unwrap(), "job_completed");
    }
}
