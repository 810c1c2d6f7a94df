//! Illustrative `Policy` + `ComputeBackend` pair.
//!
//! Shows how an embedding application plugs into the engine (spec.md §4.6,
//! §9 "Polymorphism"): `EchoPolicy` accepts any parameters and dispatches a
//! generic `echo` task onto the `work` queue; `EchoBackend` "computes" by
//! producing a single result whose object-store URI encodes the job's own
//! parameters, so a full create→start→complete round trip is observable
//! without a domain-specific backend (the cutout service itself is out of
//! scope per spec.md §1).

use async_trait::async_trait;
use std::sync::Arc;
use uws_core::domain::{Job, JobParameter, JobResult};
use uws_core::error::Result;
use uws_core::port::compute_backend::{ComputeBackend, JobInfo, WorkerError};
use uws_core::port::job_queue::WORK_QUEUE;
use uws_core::port::{JobQueue, Policy};

/// Dispatches every job as an `echo` task carrying its parameters verbatim.
pub struct EchoPolicy {
    queue: Arc<dyn JobQueue>,
}

impl EchoPolicy {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Policy for EchoPolicy {
    async fn validate_params(&self, _parameters: &[JobParameter]) -> Result<()> {
        Ok(())
    }

    async fn dispatch(&self, job: &Job, _access_token: &str) -> Result<String> {
        let args = serde_json::json!({
            "job_id": job.job_id,
            "parameters": job.parameters.iter().map(|p| (p.id.clone(), p.value.clone())).collect::<Vec<_>>(),
        });
        self.queue.enqueue(WORK_QUEUE, "echo", args).await
    }
}

/// Computes by echoing the job's own parameters back as a single JSON result.
pub struct EchoBackend;

impl ComputeBackend for EchoBackend {
    fn execute(
        &self,
        params: &[JobParameter],
        info: &JobInfo,
    ) -> std::result::Result<Vec<JobResult>, WorkerError> {
        let body = serde_json::json!({
            "job_id": info.job_id,
            "run_id": info.run_id,
            "parameters": params.iter().map(|p| (p.id.clone(), p.value.clone())).collect::<Vec<_>>(),
        });
        let size = serde_json::to_vec(&body).map(|b| b.len() as i64).ok();

        Ok(vec![JobResult {
            result_id: "echo".to_string(),
            url: format!("s3://echo-results/{}.json", info.job_id),
            size,
            mime_type: Some("application/json".to_string()),
        }])
    }
}
