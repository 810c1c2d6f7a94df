// Auth extractor — ported from `original_source/uws/dependencies.py`'s
// `auth_dependency`: every job-scoped route requires the upstream
// authenticating proxy to have set `X-Auth-Request-User`; its absence is a
// UsageError, not an AuthorizationError (the request never identified a
// caller to authorize).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

const AUTH_HEADER: &str = "x-auth-request-user";

pub struct AuthenticatedUser(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Usage(format!("missing {AUTH_HEADER} header")))?;
        Ok(AuthenticatedUser(user.to_string()))
    }
}
