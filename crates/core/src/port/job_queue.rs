// JobQueue Port — abstraction over an external key/value+queue system (spec §4.3).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two logical queues the engine uses.
pub const WORK_QUEUE: &str = "work";
pub const UWS_QUEUE: &str = "uws";

/// Outcome of `get_result` once a message has finished processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueOutcome {
    Success(Value),
    Failure(Value),
}

/// A message popped off a logical queue by a consumer (tracker or backend worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    pub task_name: String,
    pub args: Value,
}

/// Abstraction over an at-least-once delivery queue with a separate result store.
/// Messages are JSON-serializable; field ordering within a payload is irrelevant.
/// Spec.md names `enqueue`/`get_result`/`set_in_progress`/`set_complete`; `dequeue`
/// is an addition this workspace needs because, unlike the arq framework the
/// original system builds on, nothing here auto-dispatches queued tasks to
/// handler functions — a consumer loop (TrackerWorker, a backend worker) must
/// pull messages itself.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue `task_name` with `args` onto `queue_name`, returning a server-generated
    /// message id.
    async fn enqueue(&self, queue_name: &str, task_name: &str, args: Value) -> Result<String>;

    /// Block (subject to implementation-defined polling) for the next message on
    /// `queue_name`. Returns `Ok(None)` on a polling timeout with nothing available.
    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueMessage>>;

    /// Fetch the terminal result for `message_id`. `Ok(None)` means the message is
    /// still in flight (`JobResultUnavailable`). A message that was never enqueued, or
    /// whose result expired, surfaces `AppError::Queue` (`JobNotFound`).
    async fn get_result(&self, message_id: &str) -> Result<Option<QueueOutcome>>;

    /// Test/debug helper: mark a message as still in progress.
    async fn set_in_progress(&self, message_id: &str) -> Result<()>;

    /// Test/debug helper: write a terminal result directly, bypassing a real worker.
    async fn set_complete(&self, message_id: &str, outcome: QueueOutcome) -> Result<()>;
}
