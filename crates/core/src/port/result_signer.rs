// ResultSigner Port — object-store URI to signed URL translation (spec §4.2).

use crate::domain::{JobResult, JobResultSigned};
use crate::error::Result;
use async_trait::async_trait;

/// Stateless translator from an opaque backend result URI to a time-limited,
/// client-facing URL. Implementations must not cache: callers invoke this
/// once per result, at response-render time.
#[async_trait]
pub trait ResultSigner: Send + Sync {
    /// Fails `AppError::Signing` if `result.url`'s scheme is not in the
    /// configured object-store whitelist (P7).
    async fn sign(&self, result: &JobResult) -> Result<JobResultSigned>;
}
