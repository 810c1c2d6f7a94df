// JobService — front-end facade (spec §4.4).

use crate::application::worker::constants::{
    LONG_POLL_BACKOFF_MULTIPLIER, LONG_POLL_INITIAL_BACKOFF,
};
use crate::domain::{Job, JobDescription, JobId, JobParameter, Phase};
use crate::error::{AppError, Result};
use crate::port::job_store::{Availability, ListFilter};
use crate::port::{JobQueue, JobStore, Policy, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Configuration JobService needs that is not carried on individual requests.
#[derive(Debug, Clone)]
pub struct JobServiceConfig {
    pub execution_duration: i64,
    pub lifetime_secs: i64,
    pub wait_timeout_secs: i64,
}

pub struct JobService {
    store: Arc<dyn JobStore>,
    #[allow(dead_code)]
    queue: Arc<dyn JobQueue>,
    policy: Arc<dyn Policy>,
    time: Arc<dyn TimeProvider>,
    config: JobServiceConfig,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        policy: Arc<dyn Policy>,
        time: Arc<dyn TimeProvider>,
        config: JobServiceConfig,
    ) -> Self {
        Self {
            store,
            queue,
            policy,
            time,
            config,
        }
    }

    pub async fn availability(&self) -> Availability {
        self.store.availability().await
    }

    /// Ownership check shared by every job-scoped method (I7).
    fn require_owner(job: &Job, user: &str) -> Result<()> {
        if job.owner != user {
            return Err(AppError::PermissionDenied);
        }
        Ok(())
    }

    #[instrument(skip(self, parameters))]
    pub async fn create(
        &self,
        user: &str,
        run_id: Option<String>,
        parameters: Vec<JobParameter>,
    ) -> Result<Job> {
        self.policy
            .validate_params(&parameters)
            .await
            .map_err(|e| match e {
                AppError::ParameterError(m) => AppError::ParameterError(m),
                other => other,
            })?;

        self.store
            .add(
                user,
                run_id,
                parameters,
                self.config.execution_duration,
                self.config.lifetime_secs,
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn start(&self, user: &str, job_id: JobId, access_token: &str) -> Result<String> {
        let job = self.store.get(job_id).await?;
        Self::require_owner(&job, user)?;

        if !matches!(job.phase, Phase::Pending | Phase::Held) {
            return Err(AppError::InvalidPhase(format!(
                "cannot start job in phase {}",
                job.phase
            )));
        }

        let message_id = self.policy.dispatch(&job, access_token).await?;
        self.store
            .mark_queued(job_id, message_id.clone())
            .await?;
        Ok(message_id)
    }

    /// Long-poll `get` per spec §4.4.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        user: &str,
        job_id: JobId,
        wait: Option<i64>,
        wait_phase: Option<Phase>,
        wait_for_completion: bool,
    ) -> Result<Job> {
        let mut job = self.store.get(job_id).await?;
        Self::require_owner(&job, user)?;

        // wait=0 (or absent) returns immediately; wait<0 or wait>max is clamped to
        // the configured maximum (spec §4.4, boundary conditions in §8).
        let wait = match wait {
            Some(0) | None => return Ok(job),
            Some(w) => w,
        };

        if !job.phase.is_active() {
            return Ok(job);
        }

        let wait = if wait < 0 || wait > self.config.wait_timeout_secs {
            self.config.wait_timeout_secs
        } else {
            wait
        };

        let deadline = tokio::time::Instant::now() + Duration::from_secs(wait as u64);
        let wait_phase = wait_phase.unwrap_or(job.phase);

        let not_done = |j: &Job| -> bool {
            if wait_for_completion {
                j.phase.is_active()
            } else {
                j.phase == wait_phase
            }
        };

        let mut delay = LONG_POLL_INITIAL_BACKOFF;
        while not_done(&job) {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = deadline - now;
            let sleep_for = delay.min(remaining);
            tokio::time::sleep(sleep_for).await;

            job = self.store.get(job_id).await?;

            delay = Duration::from_secs_f64(delay.as_secs_f64() * LONG_POLL_BACKOFF_MULTIPLIER);
        }

        Ok(job)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user: &str,
        phases: Option<Vec<Phase>>,
        after: Option<i64>,
        count: Option<usize>,
    ) -> Result<Vec<JobDescription>> {
        self.store
            .list(ListFilter {
                owner: user.to_string(),
                phases,
                after,
                count,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user: &str, job_id: JobId) -> Result<()> {
        let job = self.store.get(job_id).await?;
        Self::require_owner(&job, user)?;
        // Does not attempt to abort the in-flight backend task (out of scope, spec §1).
        self.store.delete(job_id).await
    }

    #[instrument(skip(self))]
    pub async fn update_destruction(
        &self,
        user: &str,
        job_id: JobId,
        requested: i64,
    ) -> Result<i64> {
        let job = self.store.get(job_id).await?;
        Self::require_owner(&job, user)?;

        let new_value = self.policy.validate_destruction(requested, &job);
        if new_value != job.destruction_time {
            self.store.update_destruction(job_id, new_value).await?;
        }
        Ok(new_value)
    }

    #[instrument(skip(self))]
    pub async fn update_execution_duration(
        &self,
        user: &str,
        job_id: JobId,
        requested: i64,
    ) -> Result<i64> {
        let job = self.store.get(job_id).await?;
        Self::require_owner(&job, user)?;

        let new_value = self
            .policy
            .validate_execution_duration(requested, &job);
        if new_value != job.execution_duration {
            self.store
                .update_execution_duration(job_id, new_value)
                .await?;
        }
        Ok(new_value)
    }

    /// `now()` convenience used by the HTTP layer for timestamp rendering.
    pub fn now_millis(&self) -> i64 {
        self.time.now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, JobError, JobParameter, JobResult};
    use crate::port::job_queue::{QueueMessage, QueueOutcome};
    use crate::port::time_provider::SystemTimeProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct InMemoryStore {
        jobs: Mutex<std::collections::HashMap<JobId, Job>>,
    }

    #[async_trait]
    impl JobStore for InMemoryStore {
        async fn add(
            &self,
            owner: &str,
            run_id: Option<String>,
            parameters: Vec<JobParameter>,
            execution_duration: i64,
            lifetime_secs: i64,
        ) -> Result<Job> {
            let mut jobs = self.jobs.lock().unwrap();
            let id = jobs.len() as i64 + 1;
            let job = Job::new(id, owner, run_id, parameters, 1_000, lifetime_secs, execution_duration);
            jobs.insert(id, job.clone());
            Ok(job)
        }

        async fn get(&self, job_id: JobId) -> Result<Job> {
            self.jobs
                .lock()
                .unwrap()
                .get(&job_id)
                .cloned()
                .ok_or(AppError::UnknownJob(job_id))
        }

        async fn list(&self, _filter: ListFilter) -> Result<Vec<JobDescription>> {
            Ok(self.jobs.lock().unwrap().values().map(|j| j.description()).collect())
        }

        async fn delete(&self, job_id: JobId) -> Result<()> {
            self.jobs.lock().unwrap().remove(&job_id);
            Ok(())
        }

        async fn mark_queued(&self, job_id: JobId, message_id: String) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(&job_id) {
                let _ = job.mark_queued(message_id);
            }
            Ok(())
        }

        async fn mark_executing(&self, job_id: JobId, start_time: i64) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(&job_id) {
                let _ = job.mark_executing(start_time);
            }
            Ok(())
        }

        async fn mark_completed(&self, job_id: JobId, results: Vec<JobResult>) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(&job_id) {
                job.mark_completed(results, 2_000);
            }
            Ok(())
        }

        async fn mark_failed(&self, job_id: JobId, error: JobError) -> Result<()> {
            let mut jobs = self.jobs.lock().unwrap();
            if let Some(job) = jobs.get_mut(&job_id) {
                job.mark_failed(error, 2_000);
            }
            Ok(())
        }

        async fn update_destruction(&self, job_id: JobId, destruction_time: i64) -> Result<()> {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(&job_id) {
                job.destruction_time = destruction_time;
            }
            Ok(())
        }

        async fn update_execution_duration(&self, job_id: JobId, execution_duration: i64) -> Result<()> {
            if let Some(job) = self.jobs.lock().unwrap().get_mut(&job_id) {
                job.execution_duration = execution_duration;
            }
            Ok(())
        }

        async fn expire_jobs(&self, now: i64) -> Result<u64> {
            let mut jobs = self.jobs.lock().unwrap();
            let before = jobs.len();
            jobs.retain(|_, j| j.destruction_time > now);
            Ok((before - jobs.len()) as u64)
        }

        async fn availability(&self) -> Availability {
            Availability { available: true, note: None }
        }
    }

    struct NoopQueue;

    #[async_trait]
    impl JobQueue for NoopQueue {
        async fn enqueue(&self, _queue_name: &str, _task_name: &str, _args: serde_json::Value) -> Result<String> {
            Ok("msg-1".to_string())
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

    struct PermissivePolicy;

    #[async_trait]
    impl Policy for PermissivePolicy {
        async fn validate_params(&self, _parameters: &[JobParameter]) -> Result<()> {
            Ok(())
        }
        async fn dispatch(&self, _job: &Job, _access_token: &str) -> Result<String> {
            Ok("msg-1".to_string())
        }
    }

    fn service() -> JobService {
        JobService::new(
            Arc::new(InMemoryStore { jobs: Mutex::new(std::collections::HashMap::new()) }),
            Arc::new(NoopQueue),
            Arc::new(PermissivePolicy),
            Arc::new(SystemTimeProvider),
            JobServiceConfig {
                execution_duration: 60,
                lifetime_secs: 3600,
                wait_timeout_secs: 60,
            },
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips_owner_and_phase() {
        let svc = service();
        let job = svc
            .create("alice", None, vec![JobParameter::new("Pos", "RANGE 0 360 -2 2", false)])
            .await
            .unwrap();
        assert_eq!(job.phase, Phase::Pending);
        assert_eq!(job.parameters[0].id, "pos");

        let fetched = svc.get("alice", job.job_id, None, None, false).await.unwrap();
        assert_eq!(fetched.job_id, job.job_id);
    }

    #[tokio::test]
    async fn get_by_non_owner_is_permission_denied() {
        let svc = service();
        let job = svc.create("alice", None, vec![]).await.unwrap();
        let err = svc.get("mallory", job.job_id, None, None, false).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
    }

    #[tokio::test]
    async fn start_requires_pending_or_held_phase() {
        let svc = service();
        let job = svc.create("alice", None, vec![]).await.unwrap();
        svc.start("alice", job.job_id, "token").await.unwrap();
        let err = svc.start("alice", job.job_id, "token").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidPhase(_)));
    }

    #[tokio::test]
    async fn get_with_wait_zero_returns_immediately() {
        let svc = service();
        let job = svc.create("alice", None, vec![]).await.unwrap();
        let fetched = svc.get("alice", job.job_id, Some(0), None, false).await.unwrap();
        assert_eq!(fetched.phase, Phase::Pending);
    }
}
