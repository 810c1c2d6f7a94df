// TrackerWorker — reconciles backend-reported transitions into the JobStore (spec §4.5).

use crate::application::worker::constants::{
    ERROR_RECOVERY_SLEEP_DURATION, RESULT_POLL_CADENCE, RESULT_POLL_TIMEOUT,
    TRACKER_IDLE_SLEEP_DURATION,
};
use crate::application::worker::ShutdownToken;
use crate::domain::{ErrorCode, ErrorType, JobError, JobId, JobResult};
use crate::error::{AppError, Result};
use crate::port::job_queue::{QueueMessage, QueueOutcome, UWS_QUEUE};
use crate::port::{JobQueue, JobStore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct JobStartedArgs {
    job_id: JobId,
    start_time: i64,
}

#[derive(Debug, Deserialize)]
struct JobCompletedArgs {
    job_id: JobId,
}

pub struct TrackerWorker {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
}

impl TrackerWorker {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }

    /// Consume the `uws` queue until `shutdown` fires.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!("tracker worker started");
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("tracker worker shutting down");
                    break;
                }
                result = self.queue.dequeue(UWS_QUEUE) => {
                    match result {
                        Ok(Some(message)) => {
                            if let Err(e) = self.handle(message).await {
                                error!(error = ?e, "tracker failed to handle message");
                                tokio::time::sleep(ERROR_RECOVERY_SLEEP_DURATION).await;
                            }
                        }
                        Ok(None) => tokio::time::sleep(TRACKER_IDLE_SLEEP_DURATION).await,
                        Err(e) => {
                            error!(error = ?e, "tracker failed to dequeue");
                            tokio::time::sleep(ERROR_RECOVERY_SLEEP_DURATION).await;
                        }
                    }
                }
            }
        }
    }

    #[instrument(skip(self, message), fields(task = %message.task_name))]
    async fn handle(&self, message: QueueMessage) -> Result<()> {
        match message.task_name.as_str() {
            "job_started" => {
                let args: JobStartedArgs = serde_json::from_value(message.args)?;
                self.job_started(args.job_id, args.start_time).await
            }
            "job_completed" => {
                let args: JobCompletedArgs = serde_json::from_value(message.args)?;
                self.job_completed(args.job_id).await
            }
            other => {
                warn!(task = other, "tracker received unknown task, dropping");
                Ok(())
            }
        }
    }

    /// `job_started(job_id, start_time)` → mark_executing; swallow UnknownJob (job was deleted).
    async fn job_started(&self, job_id: JobId, start_time: i64) -> Result<()> {
        match self.store.mark_executing(job_id, start_time).await {
            Ok(()) => Ok(()),
            Err(AppError::UnknownJob(_)) => {
                warn!(job_id, "job_started for unknown job, dropping");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// `job_completed(job_id)` — poll the queue's result store for `job.message_id`
    /// at 500ms cadence up to a 5s timeout; classify and persist the outcome.
    async fn job_completed(&self, job_id: JobId) -> Result<()> {
        let job = match self.store.get(job_id).await {
            Ok(job) => job,
            Err(AppError::UnknownJob(_)) => {
                warn!(job_id, "job_completed for unknown job, dropping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let Some(message_id) = job.message_id.clone() else {
            warn!(job_id, "job_completed with no message_id, dropping");
            return Ok(());
        };

        let deadline = tokio::time::Instant::now() + RESULT_POLL_TIMEOUT;
        loop {
            match self.queue.get_result(&message_id).await {
                Ok(Some(QueueOutcome::Success(value))) => {
                    let results: Vec<JobResult> = serde_json::from_value(value)?;
                    return self.store.mark_completed(job_id, results).await;
                }
                Ok(Some(QueueOutcome::Failure(value))) => {
                    let error = classify_failure(value);
                    return self.store.mark_failed(job_id, error).await;
                }
                Ok(None) => {
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    tokio::time::sleep(RESULT_POLL_CADENCE).await;
                }
                Err(_) => break,
            }
        }

        // Result never materialized within the bounded window; this is not fatal,
        // it is classified TRANSIENT / SERVICE_UNAVAILABLE (spec §4.5, §9).
        let error = JobError {
            error_type: ErrorType::Transient,
            error_code: ErrorCode::ServiceUnavailable,
            message: "result unavailable after tracker poll timeout".to_string(),
            detail: None,
        };
        self.store.mark_failed(job_id, error).await
    }
}

fn classify_failure(value: serde_json::Value) -> JobError {
    let error_type = value
        .get("error_type")
        .and_then(|v| v.as_str())
        .map(|s| {
            if s.eq_ignore_ascii_case("fatal") {
                ErrorType::Fatal
            } else {
                ErrorType::Transient
            }
        })
        .unwrap_or(ErrorType::Transient);
    let message = value
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown worker error")
        .to_string();
    let detail = value.get("detail").and_then(|v| v.as_str()).map(str::to_string);
    let error_code = value
        .get("error_code")
        .and_then(|v| v.as_str())
        .map(|s| ErrorCode::Other(s.to_string()))
        .unwrap_or(ErrorCode::ServiceUnavailable);

    JobError { error_type, error_code, message, detail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, JobParameter, Phase};
    use crate::port::job_store::{Availability, ListFilter};
    use crate::port::JobStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        jobs: Mutex<HashMap<JobId, Job>>,
    }

    #[async_trait]
    impl JobStore for FakeStore {
        async fn add(&self, _: &str, _: Option<String>, _: Vec<JobParameter>, _: i64, _: i64) -> Result<Job> {
            unreachable!()
        }
        async fn get(&self, job_id: JobId) -> Result<Job> {
            self.jobs.lock().unwrap().get(&job_id).cloned().ok_or(AppError::UnknownJob(job_id))
        }
        async fn list(&self, _: ListFilter) -> Result<Vec<crate::domain::JobDescription>> {
            Ok(vec![])
        }
        async fn delete(&self, _: JobId) -> Result<()> {
            Ok(())
        }
        async fn mark_queued(&self, _: JobId, _: String) -> Result<()> {
            Ok(())
        }
        async fn mark_executing(&self, job_id: JobId, start_time: i64) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(&job_id) {
                Some(job) => {
                    let _ = job.mark_executing(start_time);
                    Ok(())
                }
                None => Err(AppError::UnknownJob(job_id)),
            }
        }
        async fn mark_completed(&self, job_id: JobId, results: Vec<JobResult>) -> Result<()> {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(&job_id) {
                job.mark_completed(results, 5_000);
            }
            Ok(())
        }
        async fn mark_failed(&self, job_id: JobId, error: JobError) -> Result<()> {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(&job_id) {
                job.mark_failed(error, 5_000);
            }
            Ok(())
        }
        async fn update_destruction(&self, _: JobId, _: i64) -> Result<()> {
            Ok(())
        }
        async fn update_execution_duration(&self, _: JobId, _: i64) -> Result<()> {
            Ok(())
        }
        async fn expire_jobs(&self, _: i64) -> Result<u64> {
            Ok(0)
        }
        async fn availability(&self) -> Availability {
            Availability { available: true, note: None }
        }
    }

    struct FakeQueue {
        outcome: Mutex<Option<QueueOutcome>>,
    }

    #[async_trait]
    impl JobQueue for FakeQueue {
        async fn enqueue(&self, _: &str, _: &str, _: serde_json::Value) -> Result<String> {
            Ok("m-1".into())
        }
        async fn dequeue(&self, _: &str) -> Result<Option<QueueMessage>> {
            Ok(None)
        }
        async fn get_result(&self, _: &str) -> Result<Option<QueueOutcome>> {
            Ok(self.outcome.lock().unwrap().clone())
        }
        async fn set_in_progress(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn set_complete(&self, _: &str, outcome: QueueOutcome) -> Result<()> {
            *self.outcome.lock().unwrap() = Some(outcome);
            Ok(())
        }
    }

    fn job_with_message(phase: Phase, message_id: Option<&str>) -> Job {
        let mut job = Job::new(1, "alice", None, vec![], 1_000, 3600, 60);
        job.phase = phase;
        job.message_id = message_id.map(String::from);
        job
    }

    #[tokio::test]
    async fn job_started_swallows_unknown_job() {
        let tracker = TrackerWorker::new(
            Arc::new(FakeStore { jobs: Mutex::new(HashMap::new()) }),
            Arc::new(FakeQueue { outcome: Mutex::new(None) }),
        );
        assert!(tracker.job_started(999, 2_000).await.is_ok());
    }

    #[tokio::test]
    async fn job_completed_marks_completed_on_success() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job_with_message(Phase::Executing, Some("m-1")));
        let store = Arc::new(FakeStore { jobs: Mutex::new(jobs) });
        let queue = Arc::new(FakeQueue {
            outcome: Mutex::new(Some(QueueOutcome::Success(serde_json::json!([])))),
        });
        let tracker = TrackerWorker::new(store.clone(), queue);

        tracker.job_completed(1).await.unwrap();
        let job = store.get(1).await.unwrap();
        assert_eq!(job.phase, Phase::Completed);
    }

    #[tokio::test]
    async fn job_completed_marks_failed_on_failure() {
        let mut jobs = HashMap::new();
        jobs.insert(1, job_with_message(Phase::Executing, Some("m-1")));
        let store = Arc::new(FakeStore { jobs: Mutex::new(jobs) });
        let queue = Arc::new(FakeQueue {
            outcome: Mutex::new(Some(QueueOutcome::Failure(serde_json::json!({
                "error_type": "fatal",
                "message": "Error Whoops",
                "detail": "Some details"
            })))),
        });
        let tracker = TrackerWorker::new(store.clone(), queue);

        tracker.job_completed(1).await.unwrap();
        let job = store.get(1).await.unwrap();
        assert_eq!(job.phase, Phase::Error);
        assert_eq!(job.error.unwrap().message, "Error Whoops");
    }
}
