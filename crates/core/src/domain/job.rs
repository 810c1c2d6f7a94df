// UWS Job Domain Model

use serde::{Deserialize, Serialize};

/// Job ID, server-assigned and monotonic per store.
pub type JobId = i64;

/// Opaque handle into the work queue for the active dispatch.
pub type MessageId = String;

/// Execution phase of a UWS job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
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

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Pending => "PENDING",
            Phase::Queued => "QUEUED",
            Phase::Executing => "EXECUTING",
            Phase::Completed => "COMPLETED",
            Phase::Error => "ERROR",
            Phase::Aborted => "ABORTED",
            Phase::Held => "HELD",
            Phase::Suspended => "SUSPENDED",
            Phase::Archived => "ARCHIVED",
            Phase::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Phase {
    type Err = crate::domain::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "PENDING" => Phase::Pending,
            "QUEUED" => Phase::Queued,
            "EXECUTING" => Phase::Executing,
            "COMPLETED" => Phase::Completed,
            "ERROR" => Phase::Error,
            "ABORTED" => Phase::Aborted,
            "HELD" => Phase::Held,
            "SUSPENDED" => Phase::Suspended,
            "ARCHIVED" => Phase::Archived,
            _ => Phase::Unknown,
        })
    }
}

/// Phases on which a long-poll `get` will wait; the only mutable-parameter-forbidden phases.
pub const ACTIVE_PHASES: [Phase; 3] = [Phase::Pending, Phase::Queued, Phase::Executing];

impl Phase {
    pub fn is_active(&self) -> bool {
        ACTIVE_PHASES.contains(self)
    }
}

/// Severity classification of a job error, per the UWS protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Transient,
    Fatal,
}

/// Protocol error code. Open per spec: embedding applications may carry their own
/// taxonomy through `Other`; core only needs a code for its own transient failures.
/// Serializes/deserializes as a bare string rather than the usual enum tagging so
/// that `Other(String)` round-trips any embedder-supplied code unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    ServiceUnavailable,
    Other(String),
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            ErrorCode::Other(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "SERVICE_UNAVAILABLE" => ErrorCode::ServiceUnavailable,
            _ => ErrorCode::Other(s),
        })
    }
}

/// Error recorded on a job whose phase is ERROR (I3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub error_type: ErrorType,
    pub error_code: ErrorCode,
    pub message: String,
    pub detail: Option<String>,
}

/// A single named parameter supplied at job creation. Immutable after creation (I5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParameter {
    pub id: String,
    pub value: String,
    pub is_post: bool,
}

impl JobParameter {
    /// Parameter ids are lowercased at construction (I5, P6).
    pub fn new(id: impl Into<String>, value: impl Into<String>, is_post: bool) -> Self {
        Self {
            id: id.into().to_lowercase(),
            value: value.into(),
            is_post,
        }
    }
}

/// One result produced by a completed job. Empty until COMPLETED (I2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub result_id: String,
    pub url: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

/// The same result after `ResultSigner` translation (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultSigned {
    pub result_id: String,
    pub url: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

/// Abbreviated job view returned by `list` (omits parameters/results).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_id: JobId,
    pub owner: String,
    pub phase: Phase,
    pub run_id: Option<String>,
    pub creation_time: i64,
}

/// The central entity: a single asynchronous unit of work and its full lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub owner: String,
    pub run_id: Option<String>,
    pub phase: Phase,
    pub message_id: Option<MessageId>,

    pub parameters: Vec<JobParameter>,
    pub results: Vec<JobResult>,
    pub error: Option<JobError>,

    pub creation_time: i64,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub destruction_time: i64,
    pub execution_duration: i64,
    pub quote: Option<i64>,
}

impl Job {
    /// Construct a new job in PENDING, per `JobStore::add` (§4.1).
    pub fn new(
        job_id: JobId,
        owner: impl Into<String>,
        run_id: Option<String>,
        parameters: Vec<JobParameter>,
        creation_time: i64,
        lifetime_secs: i64,
        execution_duration: i64,
    ) -> Self {
        Self {
            job_id,
            owner: owner.into(),
            run_id,
            phase: Phase::Pending,
            message_id: None,
            parameters,
            results: Vec::new(),
            error: None,
            creation_time,
            start_time: None,
            end_time: None,
            destruction_time: creation_time + lifetime_secs * 1000,
            execution_duration,
            quote: None,
        }
    }

    pub fn description(&self) -> JobDescription {
        JobDescription {
            job_id: self.job_id,
            owner: self.owner.clone(),
            phase: self.phase,
            run_id: self.run_id.clone(),
            creation_time: self.creation_time,
        }
    }

    /// `mark_queued`: guarded by current phase in {PENDING, HELD} (§4.1).
    pub fn mark_queued(&mut self, message_id: MessageId) -> crate::domain::error::Result<()> {
        if !matches!(self.phase, Phase::Pending | Phase::Held) {
            return Err(crate::domain::error::DomainError::InvalidPhaseTransition {
                from: self.phase,
                to: Phase::Queued,
            });
        }
        self.message_id = Some(message_id);
        self.phase = Phase::Queued;
        Ok(())
    }

    /// `mark_executing`: start_time is unconditional; only the phase
    /// transition is guarded by current phase in {PENDING, QUEUED} (§4.1).
    /// A guard miss still records start_time so a `job_started` delivered
    /// after a terminal write doesn't leave it unset (S7).
    pub fn mark_executing(&mut self, start_time: i64) -> crate::domain::error::Result<()> {
        self.start_time = Some(start_time);
        if !matches!(self.phase, Phase::Pending | Phase::Queued) {
            return Err(crate::domain::error::DomainError::InvalidPhaseTransition {
                from: self.phase,
                to: Phase::Executing,
            });
        }
        self.phase = Phase::Executing;
        Ok(())
    }

    /// `mark_completed`: unconditional terminal write (I2, I4).
    pub fn mark_completed(&mut self, results: Vec<JobResult>, end_time: i64) {
        self.results = results;
        self.error = None;
        self.end_time = Some(end_time);
        self.phase = Phase::Completed;
    }

    /// `mark_failed`: unconditional terminal write (I3, I4).
    pub fn mark_failed(&mut self, error: JobError, end_time: i64) {
        self.error = Some(error);
        self.end_time = Some(end_time);
        self.phase = Phase::Error;
    }
}
