//! Shared test harness: an in-memory `JobQueue`/`ResultSigner` pair standing
//! in for Redis/S3, wired the same way `crates/daemon`'s composition root
//! wires the real adapters, serving the real HTTP surface over loopback.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use uws_api_http::{build_router, AppState};
use uws_core::application::{
    shutdown_channel, BackendAdapter, JobService, JobServiceConfig, ShutdownSender, TrackerWorker,
    WorkConsumer,
};
use uws_core::domain::{JobResult, JobResultSigned};
use uws_core::error::{AppError, Result};
use uws_core::port::job_queue::{QueueMessage, QueueOutcome};
use uws_core::port::time_provider::SystemTimeProvider;
use uws_core::port::{JobQueue, ResultSigner};
use uws_demo_echo_backend::{EchoBackend, EchoPolicy};
use uws_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};
use uws_infra_worker::SingleThreadExecutor;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Simple list-per-queue + map-per-result fake, enough to exercise the real
/// `TrackerWorker`/`WorkConsumer`/`BackendAdapter` pipeline without Redis.
#[derive(Default)]
struct QueueState {
    queues: HashMap<String, VecDeque<QueueMessage>>,
    results: HashMap<String, QueueOutcome>,
}

pub struct InMemoryJobQueue {
    state: Mutex<QueueState>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self { state: Mutex::new(QueueState::default()) }
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, queue_name: &str, task_name: &str, args: serde_json::Value) -> Result<String> {
        let message_id = format!("test-msg-{}", NEXT_ID.fetch_add(1, Ordering::SeqCst));
        let message = QueueMessage { message_id: message_id.clone(), task_name: task_name.to_string(), args };
        self.state
            .lock()
            .unwrap()
            .queues
            .entry(queue_name.to_string())
            .or_default()
            .push_back(message);
        Ok(message_id)
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueMessage>> {
        Ok(self.state.lock().unwrap().queues.entry(queue_name.to_string()).or_default().pop_front())
    }

    async fn get_result(&self, message_id: &str) -> Result<Option<QueueOutcome>> {
        Ok(self.state.lock().unwrap().results.get(message_id).cloned())
    }

    async fn set_in_progress(&self, _message_id: &str) -> Result<()> {
        Ok(())
    }

    async fn set_complete(&self, message_id: &str, outcome: QueueOutcome) -> Result<()> {
        self.state.lock().unwrap().results.insert(message_id.to_string(), outcome);
        Ok(())
    }
}

/// Stands in for `S3ResultSigner`: accepts only `s3://` URIs (P7's whitelist)
/// and turns them into a deterministic fake HTTPS URL instead of calling AWS.
pub struct FakeResultSigner;

#[async_trait]
impl ResultSigner for FakeResultSigner {
    async fn sign(&self, result: &JobResult) -> Result<JobResultSigned> {
        let key = result
            .url
            .strip_prefix("s3://")
            .ok_or_else(|| AppError::Signing(format!("unsupported result URI scheme: {}", result.url)))?;
        Ok(JobResultSigned {
            result_id: result.result_id.clone(),
            url: format!("https://signed.test/{key}?sig=fake"),
            size: result.size,
            mime_type: result.mime_type.clone(),
        })
    }
}

pub struct TestApp {
    pub base_url: String,
    pub store: Arc<dyn uws_core::port::JobStore>,
    shutdown: ShutdownSender,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

/// Spins up the full engine (real store, real HTTP surface, real worker
/// loops) against an in-memory queue/signer on an ephemeral loopback port.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(5, Arc::new(EchoBackend)).await
}

pub async fn spawn_app_with_wait_timeout(wait_timeout_secs: i64) -> TestApp {
    spawn_app_with(wait_timeout_secs, Arc::new(EchoBackend)).await
}

/// Same wiring as `spawn_app`, but with a caller-supplied compute backend —
/// used to exercise a classified-failure path without echo's always-succeeds
/// behavior.
pub async fn spawn_app_with(
    wait_timeout_secs: i64,
    backend: Arc<dyn uws_core::port::ComputeBackend>,
) -> TestApp {
    let n = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    let db_path = std::env::temp_dir().join(format!("uws-integration-test-{}-{n}.db", std::process::id()));
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let pool = create_pool(&db_url).await.expect("creating sqlite pool");
    run_migrations(&pool).await.expect("running migrations");

    let time = Arc::new(SystemTimeProvider);
    let store: Arc<dyn uws_core::port::JobStore> = Arc::new(SqliteJobStore::new(pool, time.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new());
    let signer: Arc<dyn ResultSigner> = Arc::new(FakeResultSigner);
    let policy: Arc<dyn uws_core::port::Policy> = Arc::new(EchoPolicy::new(queue.clone()));

    let config = JobServiceConfig {
        execution_duration: 3600,
        lifetime_secs: 3600,
        wait_timeout_secs,
    };
    let service = Arc::new(JobService::new(store.clone(), queue.clone(), policy, time.clone(), config));
    let state = AppState::new(service, signer, wait_timeout_secs, "");
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("binding ephemeral port");
    let addr = listener.local_addr().expect("reading local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let tracker = TrackerWorker::new(store.clone(), queue.clone());
    let tracker_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        tracker.run(tracker_shutdown).await;
    });

    let adapter = Arc::new(BackendAdapter::new(
        backend,
        Arc::new(SingleThreadExecutor::new()),
        queue.clone(),
        time,
    ));
    let test_store = store.clone();
    let work_consumer = WorkConsumer::new(store, queue, adapter);
    tokio::spawn(async move {
        work_consumer.run(shutdown_rx).await;
    });

    TestApp { base_url: format!("http://{addr}"), store: test_store, shutdown: shutdown_tx }
}
