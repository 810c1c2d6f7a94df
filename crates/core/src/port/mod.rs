// Port Layer - Interfaces for external dependencies

pub mod compute_backend;
pub mod compute_executor;
pub mod job_queue;
pub mod job_store;
pub mod policy;
pub mod result_signer;
pub mod time_provider;

// Re-exports
pub use compute_backend::{ComputeBackend, JobInfo, WorkerError};
pub use compute_executor::ComputeExecutor;
pub use job_queue::{JobQueue, QueueMessage, QueueOutcome, UWS_QUEUE, WORK_QUEUE};
pub use job_store::{Availability, JobStore, ListFilter};
pub use policy::Policy;
pub use result_signer::ResultSigner;
pub use time_provider::TimeProvider;
