// WorkConsumer — pulls dispatched jobs off the `work` queue and runs them
// through `BackendAdapter` (spec §4.5). Complements `TrackerWorker`, which
// consumes the `uws` queue the adapter reports back onto; this is the other
// half of the two-queue model (spec §5 "two-queue model").

use crate::application::backend_adapter::BackendAdapter;
use crate::application::worker::constants::{ERROR_RECOVERY_SLEEP_DURATION, TRACKER_IDLE_SLEEP_DURATION};
use crate::application::worker::ShutdownToken;
use crate::domain::{JobId, JobParameter};
use crate::error::Result;
use crate::port::job_queue::{QueueMessage, WORK_QUEUE};
use crate::port::{JobQueue, JobStore};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// The shape a `Policy::dispatch` implementation is expected to enqueue onto
/// `WORK_QUEUE`: the job id plus its parameters, so the consumer does not need
/// to round-trip through the store just to learn what to compute.
#[derive(Debug, Deserialize)]
struct WorkArgs {
    job_id: JobId,
    #[serde(default)]
    parameters: Vec<(String, String)>,
}

pub struct WorkConsumer {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    adapter: Arc<BackendAdapter>,
}

impl WorkConsumer {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn JobQueue>, adapter: Arc<BackendAdapter>) -> Self {
        Self { store, queue, adapter }
    }

    /// Consume the `work` queue until `shutdown` fires.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!("work consumer started");
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("work consumer shutting down");
                    break;
                }
                result = self.queue.dequeue(WORK_QUEUE) => {
                    match result {
                        Ok(Some(message)) => {
                            if let Err(e) = self.handle(message).await {
                                error!(error = ?e, "work consumer failed to handle message");
                                tokio::time::sleep(ERROR_RECOVERY_SLEEP_DURATION).await;
                            }
                        }
                        Ok(None) => tokio::time::sleep(TRACKER_IDLE_SLEEP_DURATION).await,
                        Err(e) => {
                            error!(error = ?e, "work consumer failed to dequeue");
                            tokio::time::sleep(ERROR_RECOVERY_SLEEP_DURATION).await;
                        }
                    }
                }
            }
        }
    }

    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn handle(&self, message: QueueMessage) -> Result<()> {
        let args: WorkArgs = match serde_json::from_value(message.args) {
            Ok(args) => args,
            Err(e) => {
                warn!(error = %e, "dropping malformed work message");
                return Ok(());
            }
        };

        let job = match self.store.get(args.job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id = args.job_id, error = ?e, "work message for unknown job, dropping");
                return Ok(());
            }
        };

        let params: Vec<JobParameter> = args
            .parameters
            .into_iter()
            .map(|(id, value)| JobParameter::new(id, value, false))
            .collect();
        // execution_duration = 0 disables the timeout (spec §8 boundary condition).
        let timeout = (job.execution_duration > 0)
            .then(|| Duration::from_secs(job.execution_duration as u64));

        self.adapter
            .run(job.job_id, &message.message_id, params, job.run_id.clone(), timeout)
            .await
    }
}
