//! Client-side mirror of the UWS wire types (spec §3, §6.3).
//!
//! These are deliberately distinct from `uws_core::domain` — the sdk speaks
//! only the XML wire protocol and must not assume it is linked against the
//! same binary as the server.

use serde::{Deserialize, Serialize};

/// Execution phase, matching `uws:phase`'s text content one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    Pending,
    Queued,
    Executing,
    Completed,
    Error,
    Aborted,
    Held,
    Suspended,
    Archived,
    Unknown,
}

impl JobPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, JobPhase::Pending | JobPhase::Queued | JobPhase::Executing)
    }
}

impl std::str::FromStr for JobPhase {
    type Err = crate::error::SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PENDING" => JobPhase::Pending,
            "QUEUED" => JobPhase::Queued,
            "EXECUTING" => JobPhase::Executing,
            "COMPLETED" => JobPhase::Completed,
            "ERROR" => JobPhase::Error,
            "ABORTED" => JobPhase::Aborted,
            "HELD" => JobPhase::Held,
            "SUSPENDED" => JobPhase::Suspended,
            "ARCHIVED" => JobPhase::Archived,
            _ => JobPhase::Unknown,
        })
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobPhase::Pending => "PENDING",
            JobPhase::Queued => "QUEUED",
            JobPhase::Executing => "EXECUTING",
            JobPhase::Completed => "COMPLETED",
            JobPhase::Error => "ERROR",
            JobPhase::Aborted => "ABORTED",
            JobPhase::Held => "HELD",
            JobPhase::Suspended => "SUSPENDED",
            JobPhase::Archived => "ARCHIVED",
            JobPhase::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// One `<uws:parameter>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParameter {
    pub id: String,
    pub value: String,
}

/// One `<uws:result>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub result_id: String,
    pub url: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

/// The `<uws:errorSummary>` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobErrorSummary {
    pub error_type: String,
    pub message: String,
    pub detail: Option<String>,
}

/// A full `uws:job` document, parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    pub owner: String,
    pub phase: JobPhase,
    pub run_id: Option<String>,
    pub creation_time: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub destruction_time: String,
    pub execution_duration: i64,
    pub quote: Option<String>,
    pub parameters: Vec<JobParameter>,
    pub results: Vec<JobResult>,
    pub error: Option<JobErrorSummary>,
}

/// One `<uws:jobref>` entry from a `uws:jobs` list document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: i64,
    pub phase: JobPhase,
    pub href: String,
}

/// Options accepted by `UwsClient::create_job`.
#[derive(Debug, Clone, Default)]
pub struct CreateJobRequest {
    pub run_id: Option<String>,
    pub parameters: Vec<(String, String)>,
    /// Request `phase=RUN` so the server starts the job immediately.
    pub start: bool,
}

/// Wait semantics for `UwsClient::get_job` (spec §4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitOptions {
    pub wait_secs: Option<i64>,
    pub wait_phase: Option<JobPhase>,
}
