//! UWS Engine SDK — Rust Client Library
//!
//! A thin async client over the engine's UWS 1.1 HTTP/XML surface (spec §6).
//!
//! # Example
//!
//! ```no_run
//! use uws_sdk::{CreateJobRequest, UwsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = UwsClient::connect("http://127.0.0.1:8080", "alice")?;
//!
//!     let job_id = client
//!         .create_job(CreateJobRequest {
//!             run_id: Some("run-1".to_string()),
//!             parameters: vec![("pos".to_string(), "RANGE 0 360 -2 2".to_string())],
//!             start: true,
//!         })
//!         .await?;
//!
//!     println!("Job created: {job_id}");
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;
mod xml;

pub use client::UwsClient;
pub use error::{Result, SdkError};
pub use types::{
    CreateJobRequest, Job, JobErrorSummary, JobParameter, JobPhase, JobResult, JobSummary,
    WaitOptions,
};
