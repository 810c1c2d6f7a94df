// Redis JobQueue Implementation
//
// Grounded on the deadpool-redis pool + redis::AsyncCommands usage pattern
// seen in sibling queue services: a per-queue list (LPUSH/RPOP) for delivery
// and a TTL'd string key per message id for the result store.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::warn;
use uws_core::error::{AppError, Result};
use uws_core::port::job_queue::{QueueMessage, QueueOutcome};
use uws_core::port::JobQueue;
use uuid::Uuid;

const RESULT_TTL_SECS: u64 = 86_400;

fn queue_key(queue_name: &str) -> String {
    format!("uws:queue:{queue_name}")
}

fn result_key(message_id: &str) -> String {
    format!("uws:result:{message_id}")
}

fn progress_key(message_id: &str) -> String {
    format!("uws:inprogress:{message_id}")
}

pub struct RedisJobQueue {
    pool: Pool,
}

impl RedisJobQueue {
    pub fn new(redis_url: &str) -> Result<Self> {
        let config = Config::from_url(redis_url);
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| AppError::Queue(e.to_string()))
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, queue_name: &str, task_name: &str, args: serde_json::Value) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        let message = QueueMessage {
            message_id: message_id.clone(),
            task_name: task_name.to_string(),
            args,
        };
        let payload = serde_json::to_string(&message).map_err(AppError::from)?;

        let mut conn = self.conn().await?;
        conn.lpush::<_, _, ()>(queue_key(queue_name), payload)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;

        Ok(message_id)
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueMessage>> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = conn
            .rpop(queue_key(queue_name), None)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;

        match payload {
            Some(raw) => {
                let message: QueueMessage = serde_json::from_str(&raw).map_err(|e| {
                    warn!(error = %e, "dropping malformed queue message");
                    AppError::from(e)
                })?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    async fn get_result(&self, message_id: &str) -> Result<Option<QueueOutcome>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(result_key(message_id))
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;

        match raw {
            Some(raw) => {
                let outcome: QueueOutcome = serde_json::from_str(&raw).map_err(AppError::from)?;
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }

    async fn set_in_progress(&self, message_id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(progress_key(message_id), "1", RESULT_TTL_SECS)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn set_complete(&self, message_id: &str, outcome: QueueOutcome) -> Result<()> {
        let payload = serde_json::to_string(&outcome).map_err(AppError::from)?;
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(result_key(message_id), payload, RESULT_TTL_SECS)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_and_distinct() {
        assert_eq!(queue_key("work"), "uws:queue:work");
        assert_eq!(result_key("m-1"), "uws:result:m-1");
        assert_ne!(result_key("m-1"), progress_key("m-1"));
    }

    #[test]
    fn enqueued_message_round_trips_through_json() {
        let message = QueueMessage {
            message_id: "m-1".into(),
            task_name: "job_started".into(),
            args: serde_json::json!({"job_id": 1}),
        };
        let raw = serde_json::to_string(&message).unwrap();
        let parsed: QueueMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.message_id, "m-1");
        assert_eq!(parsed.task_name, "job_started");
    }
}
