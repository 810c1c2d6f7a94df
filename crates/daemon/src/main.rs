//! UWS Engine daemon — composition root. Wires the SQLite store, Redis queue,
//! S3 result signer, and the illustrative echo backend into `JobService` and
//! its two background workers, then serves the UWS HTTP surface.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uws_api_http::{build_router, AppState};
use uws_core::application::{
    shutdown_channel, BackendAdapter, ExpirationScheduler, JobService, JobServiceConfig,
    TrackerWorker, WorkConsumer,
};
use uws_core::port::time_provider::SystemTimeProvider;
use uws_demo_echo_backend::{EchoBackend, EchoPolicy};
use uws_infra_redis::RedisJobQueue;
use uws_infra_sqlite::{create_pool, run_migrations, SqliteJobStore};
use uws_infra_storage::S3ResultSigner;
use uws_infra_worker::SingleThreadExecutor;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = config::load().context("loading configuration")?;

    init_logging(&app_config.log_format);

    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "failed to initialize OpenTelemetry, continuing without it");
    }

    info!(version = VERSION, "UWS engine starting");

    info!(database_url = %app_config.database_url, "opening job store");
    let pool = create_pool(&app_config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("database pool creation failed: {e}"))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("migration failed: {e}"))?;

    let time = Arc::new(SystemTimeProvider);
    let store: Arc<dyn uws_core::port::JobStore> =
        Arc::new(SqliteJobStore::new(pool, time.clone()));

    let queue_url = with_redis_password(&app_config.queue_url, app_config.queue_password.as_deref());
    info!(queue_url = %app_config.queue_url, "connecting to job queue");
    let queue: Arc<dyn uws_core::port::JobQueue> =
        Arc::new(RedisJobQueue::new(&queue_url).context("connecting to job queue")?);

    let signer: Arc<dyn uws_core::port::ResultSigner> = Arc::new(
        S3ResultSigner::from_env(Duration::from_secs(app_config.url_lifetime as u64)).await,
    );

    let policy: Arc<dyn uws_core::port::Policy> = Arc::new(EchoPolicy::new(queue.clone()));

    let service_config = JobServiceConfig {
        execution_duration: app_config.execution_duration,
        lifetime_secs: app_config.lifetime,
        wait_timeout_secs: app_config.wait_timeout,
    };
    let service = Arc::new(JobService::new(
        store.clone(),
        queue.clone(),
        policy,
        time.clone(),
        service_config,
    ));

    let state = AppState::new(
        service.clone(),
        signer,
        app_config.sync_timeout,
        app_config.path_prefix.clone(),
    );
    let app = if app_config.path_prefix.is_empty() {
        build_router(state)
    } else {
        axum::Router::new().nest(&app_config.path_prefix, build_router(state))
    };

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    info!(addr = %app_config.http_bind_addr, "starting HTTP surface");
    let bind_addr: SocketAddr = app_config
        .http_bind_addr
        .parse()
        .context("parsing http_bind_addr")?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = ?e, "HTTP server failed");
        }
    });

    info!("starting tracker worker");
    let tracker = TrackerWorker::new(store.clone(), queue.clone());
    let tracker_shutdown = shutdown_rx.clone();
    let tracker_handle = tokio::spawn(async move {
        tracker.run(tracker_shutdown).await;
    });

    info!("starting work consumer");
    let executor = Arc::new(SingleThreadExecutor::new());
    let adapter = Arc::new(BackendAdapter::new(
        Arc::new(EchoBackend),
        executor,
        queue.clone(),
        time.clone(),
    ));
    let work_consumer = WorkConsumer::new(store.clone(), queue.clone(), adapter);
    let work_shutdown = shutdown_rx.clone();
    let work_handle = tokio::spawn(async move {
        work_consumer.run(work_shutdown).await;
    });

    info!(
        interval_secs = app_config.expire_jobs_interval_secs,
        "starting expiration scheduler"
    );
    let expiration = ExpirationScheduler::new(store, time, app_config.expire_jobs_interval_secs);
    tokio::spawn(async move {
        expiration.run().await;
    });

    info!("UWS engine ready. Press Ctrl+C to shut down.");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, exiting gracefully");

    shutdown_tx.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(5), tracker_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), work_handle).await;
    server_handle.abort();

    info!("shutdown complete");
    Ok(())
}

/// Embeds `queue_password` (spec §6 configuration key) into a `redis://host:port`
/// URL as `redis://:password@host:port`, the scheme redis-rs expects for AUTH.
/// Left untouched when no password is configured or the URL already carries one.
fn with_redis_password(url: &str, password: Option<&str>) -> String {
    let Some(password) = password else { return url.to_string() };
    match url.split_once("://") {
        Some((scheme, rest)) if !rest.contains('@') => format!("{scheme}://:{password}@{rest}"),
        _ => url.to_string(),
    }
}

fn init_logging(log_format: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("uws=info"))
        .expect("failed to build env filter");

    match log_format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}
