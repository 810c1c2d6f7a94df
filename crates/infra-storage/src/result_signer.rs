// S3 ResultSigner Implementation
//
// Translates an `s3://bucket/key` result URI into a presigned, time-limited
// GET URL. Stands in for the original system's GCS signed-URL service; no
// GCS-equivalent crate is available, and the interface stays object-store
// generic so a different backend can replace this adapter later.

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use async_trait::async_trait;
use std::time::Duration;
use uws_core::domain::{JobResult, JobResultSigned};
use uws_core::error::{AppError, Result};
use uws_core::port::ResultSigner;

pub struct S3ResultSigner {
    client: Client,
    url_lifetime: Duration,
}

impl S3ResultSigner {
    pub fn new(client: Client, url_lifetime: Duration) -> Self {
        Self { client, url_lifetime }
    }

    pub async fn from_env(url_lifetime: Duration) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), url_lifetime)
    }

    /// Parses `s3://bucket/key` into `(bucket, key)`. Any other scheme is
    /// rejected (P7's object-store whitelist).
    fn parse_s3_uri(url: &str) -> Result<(&str, &str)> {
        let rest = url
            .strip_prefix("s3://")
            .ok_or_else(|| AppError::Signing(format!("unsupported result URI scheme: {url}")))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| AppError::Signing(format!("malformed s3 URI: {url}")))?;
        if bucket.is_empty() || key.is_empty() {
            return Err(AppError::Signing(format!("malformed s3 URI: {url}")));
        }
        Ok((bucket, key))
    }
}

#[async_trait]
impl ResultSigner for S3ResultSigner {
    async fn sign(&self, result: &JobResult) -> Result<JobResultSigned> {
        let (bucket, key) = Self::parse_s3_uri(&result.url)?;

        let presigning_config = PresigningConfig::expires_in(self.url_lifetime)
            .map_err(|e| AppError::Signing(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| AppError::Signing(e.to_string()))?;

        Ok(JobResultSigned {
            result_id: result.result_id.clone(),
            url: presigned.uri().to_string(),
            size: result.size,
            mime_type: result.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_s3_uri() {
        let (bucket, key) = S3ResultSigner::parse_s3_uri("s3://my-bucket/results/job-1.fits").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "results/job-1.fits");
    }

    #[test]
    fn rejects_non_s3_scheme() {
        let err = S3ResultSigner::parse_s3_uri("file:///etc/passwd").unwrap_err();
        assert!(matches!(err, AppError::Signing(_)));
    }

    #[test]
    fn rejects_missing_key() {
        let err = S3ResultSigner::parse_s3_uri("s3://bucket-only").unwrap_err();
        assert!(matches!(err, AppError::Signing(_)));
    }
}
