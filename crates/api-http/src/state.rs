// Shared application state handed to every route handler via `axum::extract::State`.

use std::sync::Arc;
use uws_core::application::job_service::JobService;
use uws_core::port::ResultSigner;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JobService>,
    pub signer: Arc<dyn ResultSigner>,
    /// `/sync`'s total wait budget (spec §5 "Timeouts").
    pub sync_timeout_secs: i64,
    /// Mount prefix the daemon bound this router under, used to build the
    /// `Location` headers on 303 responses.
    pub path_prefix: String,
}

impl AppState {
    pub fn new(
        service: Arc<JobService>,
        signer: Arc<dyn ResultSigner>,
        sync_timeout_secs: i64,
        path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            service,
            signer,
            sync_timeout_secs,
            path_prefix: path_prefix.into(),
        }
    }

    pub fn jobs_url(&self, job_id: i64) -> String {
        format!("{}/jobs/{}", self.path_prefix, job_id)
    }

    pub fn job_list_url(&self) -> String {
        format!("{}/jobs", self.path_prefix)
    }
}
