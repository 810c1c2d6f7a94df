//! UWS Client Implementation
//!
//! A thin async HTTP client over the engine's UWS 1.1 surface (spec §6),
//! replacing the teacher's jsonrpsee client the way `crates/api-http`
//! replaces its JSON-RPC server.

use crate::error::{Result, SdkError};
use crate::types::{CreateJobRequest, Job, JobSummary, WaitOptions};
use crate::xml;
use reqwest::{Client as HttpClient, StatusCode};
use std::time::Duration;

const AUTH_USER_HEADER: &str = "X-Auth-Request-User";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Request-Token";

/// Client for a single UWS engine endpoint, authenticated as a single user.
///
/// # Example
///
/// ```no_run
/// use uws_sdk::{CreateJobRequest, UwsClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = UwsClient::connect("http://127.0.0.1:8080", "alice")?;
/// let job_id = client
///     .create_job(CreateJobRequest {
///         run_id: Some("run-1".to_string()),
///         parameters: vec![("pos".to_string(), "RANGE 0 360 -2 2".to_string())],
///         start: true,
///     })
///     .await?;
/// println!("job id: {}", job_id);
/// # Ok(())
/// # }
/// ```
pub struct UwsClient {
    http: HttpClient,
    base_url: String,
    user: String,
    access_token: Option<String>,
}

impl UwsClient {
    /// Builds a client against `base_url` (e.g. `http://127.0.0.1:8080`, no
    /// trailing slash, no `/jobs` suffix), authenticated as `user`.
    pub fn connect(base_url: impl Into<String>, user: impl Into<String>) -> Result<Self> {
        // The server's mutating routes answer with 303 See Other and a
        // `Location` header the caller is meant to read, not follow blindly
        // (spec §6) — disable reqwest's default auto-follow so that header
        // survives onto the response we inspect.
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            user: user.into(),
            access_token: None,
        })
    }

    /// Attaches the bearer token `Policy::dispatch` will receive on `start`.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(AUTH_USER_HEADER, &self.user);
        match &self.access_token {
            Some(token) => builder.header(AUTH_TOKEN_HEADER, token),
            None => builder,
        }
    }

    async fn raise_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify_error(status, body))
    }

    /// `POST /jobs` — creates a job, optionally starting it immediately via
    /// `phase=RUN` (spec §6). Returns the new job's id, parsed out of the
    /// `Location` header of the 303 response.
    pub async fn create_job(&self, request: CreateJobRequest) -> Result<i64> {
        let mut form: Vec<(String, String)> = request.parameters;
        if let Some(run_id) = request.run_id {
            form.push(("runid".to_string(), run_id));
        }
        if request.start {
            form.push(("phase".to_string(), "RUN".to_string()));
        }

        let resp = self.authed(self.http.post(self.url("/jobs")).form(&form)).send().await?;
        let resp = Self::raise_for_status(resp).await?;
        location_job_id(&resp)
    }

    /// `POST /jobs/{id}/phase` with `phase=RUN` — starts a PENDING/HELD job.
    pub async fn start_job(&self, job_id: i64) -> Result<()> {
        let resp = self
            .authed(self.http.post(self.url(&format!("/jobs/{job_id}/phase"))).form(&[("phase", "RUN")]))
            .send()
            .await?;
        Self::raise_for_status(resp).await?;
        Ok(())
    }

    /// `GET /jobs/{id}` with optional long-poll `wait`/`phase` query params
    /// (spec §4.4).
    pub async fn get_job(&self, job_id: i64, wait: WaitOptions) -> Result<Job> {
        let mut query = Vec::new();
        if let Some(w) = wait.wait_secs {
            query.push(("wait".to_string(), w.to_string()));
        }
        if let Some(p) = wait.wait_phase {
            query.push(("phase".to_string(), p.to_string()));
        }

        let resp = self
            .authed(self.http.get(self.url(&format!("/jobs/{job_id}"))).query(&query))
            .send()
            .await?;
        let resp = Self::raise_for_status(resp).await?;
        let body = resp.text().await?;
        xml::parse_job(&body)
    }

    /// `GET /jobs` — lists the caller's own jobs.
    pub async fn list_jobs(
        &self,
        phases: &[crate::types::JobPhase],
        after: Option<&str>,
        count: Option<usize>,
    ) -> Result<Vec<JobSummary>> {
        let mut query: Vec<(String, String)> =
            phases.iter().map(|p| ("phase".to_string(), p.to_string())).collect();
        if let Some(after) = after {
            query.push(("after".to_string(), after.to_string()));
        }
        if let Some(count) = count {
            query.push(("last".to_string(), count.to_string()));
        }

        let resp = self.authed(self.http.get(self.url("/jobs")).query(&query)).send().await?;
        let resp = Self::raise_for_status(resp).await?;
        let body = resp.text().await?;
        xml::parse_job_list(&body)
    }

    /// `DELETE /jobs/{id}`.
    pub async fn delete_job(&self, job_id: i64) -> Result<()> {
        let resp = self.authed(self.http.delete(self.url(&format!("/jobs/{job_id}")))).send().await?;
        Self::raise_for_status(resp).await?;
        Ok(())
    }

    /// `POST /jobs/{id}/destruction` — `destruction` must be an ISO-8601 UTC
    /// timestamp (`YYYY-MM-DDTHH:MM:SSZ`, spec §6).
    pub async fn update_destruction(&self, job_id: i64, destruction: &str) -> Result<()> {
        let resp = self
            .authed(
                self.http
                    .post(self.url(&format!("/jobs/{job_id}/destruction")))
                    .form(&[("destruction", destruction)]),
            )
            .send()
            .await?;
        Self::raise_for_status(resp).await?;
        Ok(())
    }

    /// `POST /jobs/{id}/executionduration`.
    pub async fn update_execution_duration(&self, job_id: i64, seconds: i64) -> Result<()> {
        let resp = self
            .authed(
                self.http
                    .post(self.url(&format!("/jobs/{job_id}/executionduration")))
                    .form(&[("executionduration", seconds.to_string())]),
            )
            .send()
            .await?;
        Self::raise_for_status(resp).await?;
        Ok(())
    }

    /// `GET /jobs/{id}/error` — the plain-text "{message}\n\n{detail}" body
    /// (spec §8 S6). Only meaningful when the job is in phase ERROR.
    pub async fn get_error(&self, job_id: i64) -> Result<String> {
        let resp = self.authed(self.http.get(self.url(&format!("/jobs/{job_id}/error")))).send().await?;
        let resp = Self::raise_for_status(resp).await?;
        Ok(resp.text().await?)
    }
}

fn location_job_id(resp: &reqwest::Response) -> Result<i64> {
    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(SdkError::MissingLocation)?;
    location
        .rsplit('/')
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SdkError::InvalidJobId(location.to_string()))
}

fn classify_error(status: StatusCode, body: String) -> SdkError {
    if body.starts_with("UsageError") {
        SdkError::Usage(body)
    } else if body.starts_with("AuthorizationError") {
        SdkError::Authorization(body)
    } else if status == StatusCode::NOT_FOUND {
        SdkError::NotFound(body)
    } else {
        SdkError::Server { status: status.as_u16(), body }
    }
}
