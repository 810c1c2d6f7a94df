// Application Layer - Use Cases and Business Logic

pub mod backend_adapter;
pub mod expiration;
pub mod job_service;
pub mod tracker;
pub mod work_consumer;
pub mod worker;

// Re-exports
pub use backend_adapter::BackendAdapter;
pub use expiration::ExpirationScheduler;
pub use job_service::{JobService, JobServiceConfig};
pub use tracker::TrackerWorker;
pub use work_consumer::WorkConsumer;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken};
