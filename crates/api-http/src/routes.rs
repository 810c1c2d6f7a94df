// HTTP route table — the 13 entries of spec §6, ported from
// `original_source/uws/handlers.py`'s generic `uws_router` one route at a time.
// Keeps the teacher's `api-rpc` layering (thin handlers delegating to
// `JobService`, errors mapped at the boundary) but speaks UWS over HTTP
// instead of JSON-RPC.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::DateTime;

use uws_core::domain::{JobId, Phase};
use uws_core::error::AppError;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::params::{self};
use crate::state::AppState;
use crate::xml;

const ACCESS_TOKEN_HEADER: &str = "x-auth-request-token";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/availability", get(availability))
        .route("/capabilities", get(capabilities))
        .route("/sync", get(sync_get).post(sync_post))
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).delete(delete_job).post(post_job_action))
        .route("/jobs/:id/destruction", get(get_destruction).post(post_destruction))
        .route(
            "/jobs/:id/executionduration",
            get(get_execution_duration).post(post_execution_duration),
        )
        .route("/jobs/:id/phase", get(get_phase).post(post_phase))
        .route("/jobs/:id/owner", get(get_owner))
        .route("/jobs/:id/parameters", get(get_parameters))
        .route("/jobs/:id/quote", get(get_quote))
        .route("/jobs/:id/results", get(get_results))
        .route("/jobs/:id/error", get(get_error))
        .with_state(state)
}

fn access_token(headers: &HeaderMap) -> String {
    headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn parse_iso8601(value: &str) -> Result<i64, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| ApiError::Usage(format!("invalid timestamp {value}: {e}")))
}

fn form_str(body: &Bytes) -> Option<&str> {
    if body.is_empty() {
        None
    } else {
        std::str::from_utf8(body).ok()
    }
}

fn plain_text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [("content-type", "text/plain")], body.into()).into_response()
}

fn xml_response(body: String) -> Response {
    (StatusCode::OK, [("content-type", "application/xml")], body).into_response()
}

// GET /availability
async fn availability(State(state): State<AppState>) -> Response {
    let availability = state.service.availability().await;
    xml_response(xml::render_availability(&availability))
}

// GET /capabilities
async fn capabilities(State(state): State<AppState>) -> Response {
    xml_response(xml::render_capabilities(&state.path_prefix))
}

/// Shared create-and-optionally-start logic for `POST /jobs` and `/sync`.
async fn create_and_maybe_start(
    state: &AppState,
    user: &str,
    token: &str,
    params: Vec<uws_core::domain::JobParameter>,
) -> Result<(JobId, bool), ApiError> {
    let (run_id, run_params) = extract_run_id_and_phase(params);
    let job = state.service.create(user, run_id, run_params.0).await.map_err(ApiError::from)?;
    if run_params.1 {
        state.service.start(user, job.job_id, token).await.map_err(ApiError::from)?;
    }
    Ok((job.job_id, run_params.1))
}

/// Pulls `runid` and `phase=RUN` out of the raw parameter list; both are
/// request-envelope concerns, not job parameters (spec §6, `original_source`
/// handlers.py's `post_job` inlines the same split).
fn extract_run_id_and_phase(
    params: Vec<uws_core::domain::JobParameter>,
) -> (Option<String>, (Vec<uws_core::domain::JobParameter>, bool)) {
    let mut run_id = None;
    let mut start = false;
    let mut rest = Vec::with_capacity(params.len());
    for param in params {
        match param.id.as_str() {
            "runid" => run_id = Some(param.value),
            "phase" if param.value.eq_ignore_ascii_case("run") => start = true,
            _ => rest.push(param),
        }
    }
    (run_id, (rest, start))
}

// POST /jobs
async fn create_job(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), form_str(&body));
    let token = access_token(&headers);
    let (job_id, _started) = create_and_maybe_start(&state, &user, &token, params).await?;
    Ok(Redirect::to(&state.jobs_url(job_id)).into_response())
}

// GET /jobs
async fn list_jobs(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let pairs = params::query_pairs(query.as_deref());
    let mut phases = Vec::new();
    let mut after = None;
    let mut count = None;
    for (key, value) in &pairs {
        match key.as_str() {
            "phase" => phases.push(value.parse::<Phase>().map_err(AppError::from).map_err(ApiError::from)?),
            "after" => after = Some(parse_iso8601(value)?),
            "last" => count = Some(value.parse::<usize>().map_err(|e| ApiError::Usage(format!("bad last: {e}")))?),
            _ => {}
        }
    }
    let phases = if phases.is_empty() { None } else { Some(phases) };
    let descriptions = state.service.list(&user, phases, after, count).await.map_err(ApiError::from)?;
    Ok(xml_response(xml::render_job_list(&descriptions, &state.job_list_url())))
}

// GET /jobs/{id}
async fn get_job(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let pairs = params::query_pairs(query.as_deref());
    let mut wait = None;
    let mut wait_phase = None;
    for (key, value) in &pairs {
        match key.as_str() {
            "wait" => wait = Some(value.parse::<i64>().map_err(|e| ApiError::Usage(format!("bad wait: {e}")))?),
            "phase" => wait_phase = Some(value.parse::<Phase>().map_err(AppError::from).map_err(ApiError::from)?),
            _ => {}
        }
    }
    let job = state.service.get(&user, id, wait, wait_phase, false).await.map_err(ApiError::from)?;
    let signed = sign_results(&state, &job).await?;
    Ok(xml_response(xml::render_job(&job, &signed)))
}

async fn sign_results(
    state: &AppState,
    job: &uws_core::domain::Job,
) -> Result<Vec<uws_core::domain::JobResultSigned>, ApiError> {
    let mut signed = Vec::with_capacity(job.results.len());
    for result in &job.results {
        signed.push(state.signer.sign(result).await.map_err(ApiError::from)?);
    }
    Ok(signed)
}

// DELETE /jobs/{id}
async fn delete_job(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    state.service.delete(&user, id).await.map_err(ApiError::from)?;
    Ok(Redirect::to(&state.job_list_url()).into_response())
}

// POST /jobs/{id} with action=DELETE — the no-DELETE-verb-support fallback (spec §6).
async fn post_job_action(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), form_str(&body));
    let action = params::single_value(&params, "action").map_err(ApiError::Usage)?;
    match action {
        Some(a) if a.eq_ignore_ascii_case("delete") => delete_job(State(state), AuthenticatedUser(user), Path(id)).await,
        _ => Err(ApiError::Usage("expected action=DELETE".to_string())),
    }
}

// GET/POST /jobs/{id}/destruction
async fn get_destruction(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    Ok(plain_text(StatusCode::OK, chrono_millis_to_iso8601(job.destruction_time)))
}

async fn post_destruction(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), form_str(&body));
    let value = params::single_value(&params, "destruction")
        .map_err(ApiError::Usage)?
        .ok_or_else(|| ApiError::Usage("missing destruction parameter".to_string()))?;
    let requested = parse_iso8601(value)?;
    state.service.update_destruction(&user, id, requested).await.map_err(ApiError::from)?;
    Ok(Redirect::to(&state.jobs_url(id)).into_response())
}

// GET/POST /jobs/{id}/executionduration
async fn get_execution_duration(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    Ok(plain_text(StatusCode::OK, job.execution_duration.to_string()))
}

async fn post_execution_duration(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), form_str(&body));
    let value = params::single_value(&params, "executionduration")
        .map_err(ApiError::Usage)?
        .ok_or_else(|| ApiError::Usage("missing executionduration parameter".to_string()))?;
    let requested = value.parse::<i64>().map_err(|e| ApiError::Usage(format!("bad executionduration: {e}")))?;
    if requested <= 0 {
        return Err(ApiError::Usage(format!("invalid duration {value}")));
    }
    state.service.update_execution_duration(&user, id, requested).await.map_err(ApiError::from)?;
    Ok(Redirect::to(&state.jobs_url(id)).into_response())
}

// GET /jobs/{id}/phase
async fn get_phase(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    Ok(plain_text(StatusCode::OK, job.phase.to_string()))
}

// POST /jobs/{id}/phase — RUN or ABORT (spec §6; ABORT is unsupported, `original_source`
// handlers.py's `post_job_phase` rejects it with a PermissionDeniedError).
async fn post_phase(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), form_str(&body));
    let value = params::single_value(&params, "phase")
        .map_err(ApiError::Usage)?
        .ok_or_else(|| ApiError::Usage("missing phase parameter".to_string()))?;
    if value.eq_ignore_ascii_case("abort") {
        return Err(ApiError::Authorization);
    }
    if !value.eq_ignore_ascii_case("run") {
        return Err(ApiError::Usage(format!("unsupported phase {value}")));
    }
    let token = access_token(&headers);
    state.service.start(&user, id, &token).await.map_err(ApiError::from)?;
    Ok(Redirect::to(&state.jobs_url(id)).into_response())
}

// GET /jobs/{id}/owner
async fn get_owner(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    Ok(plain_text(StatusCode::OK, job.owner))
}

// GET /jobs/{id}/parameters
async fn get_parameters(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    Ok(xml_response(xml::render_parameters(&job.parameters)))
}

// GET /jobs/{id}/quote
async fn get_quote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    let body = job.quote.map(chrono_millis_to_iso8601).unwrap_or_default();
    Ok(plain_text(StatusCode::OK, body))
}

// GET /jobs/{id}/results
async fn get_results(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    let signed = sign_results(&state, &job).await?;
    Ok(xml_response(xml::render_results(&signed)))
}

// GET /jobs/{id}/error — DALI-style plain text "{message}\n\n{detail}" (spec §8 S6);
// the job's `uws:errorSummary` embedded in the full job document stays XML.
async fn get_error(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<JobId>,
) -> Result<Response, ApiError> {
    let job = state.service.get(&user, id, None, None, false).await.map_err(ApiError::from)?;
    let error = job.error.ok_or_else(|| ApiError::NotFound(format!("job {id} has no error")))?;
    let body = match error.detail {
        Some(detail) => format!("{}\n\n{detail}", error.message),
        None => error.message,
    };
    Ok(plain_text(StatusCode::OK, body))
}

// GET/POST /sync — create, start, wait for completion, 303 to the first result.
async fn sync_get(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), None);
    run_sync(state, user, access_token(&headers), params).await
}

async fn sync_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = params::all_pairs(query.as_deref(), form_str(&body));
    run_sync(state, user, access_token(&headers), params).await
}

async fn run_sync(
    state: AppState,
    user: String,
    token: String,
    params: Vec<uws_core::domain::JobParameter>,
) -> Result<Response, ApiError> {
    let (run_id, run_params) = extract_run_id_and_phase(params);
    let job = state.service.create(&user, run_id, run_params.0).await.map_err(ApiError::from)?;
    state.service.start(&user, job.job_id, &token).await.map_err(ApiError::from)?;

    let finished = state
        .service
        .get(&user, job.job_id, Some(state.sync_timeout_secs), None, true)
        .await
        .map_err(ApiError::from)?;

    match finished.phase {
        Phase::Completed => {
            let first = finished
                .results
                .first()
                .ok_or_else(|| ApiError::Usage("job completed with no results".to_string()))?;
            let signed = state.signer.sign(first).await.map_err(ApiError::from)?;
            Ok(Redirect::to(&signed.url).into_response())
        }
        Phase::Error => {
            let error = finished.error.unwrap_or_else(|| uws_core::domain::JobError {
                error_type: uws_core::domain::ErrorType::Fatal,
                error_code: uws_core::domain::ErrorCode::Other("UNKNOWN".to_string()),
                message: "job failed".to_string(),
                detail: None,
            });
            let body = match error.detail {
                Some(detail) => format!("Error\n\n{}\n\n{detail}", error.message),
                None => format!("Error\n\n{}", error.message),
            };
            Ok(plain_text(StatusCode::BAD_REQUEST, body))
        }
        other => Ok(plain_text(StatusCode::BAD_REQUEST, format!("Error\n\njob did not complete in time (phase {other})"))),
    }
}

fn chrono_millis_to_iso8601(millis: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}
