use crate::ArchiveSource;
use async_trait::async_trait;
use bytes::Bytes;
use history_models::{ArchiveConfig, HistoryError};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument};

/// Anonymous HTTP access to a public S3 bucket holding a history archive.
pub struct S3Archive {
    client: reqwest::Client,
    base_url: String,
}

impl S3Archive {
    pub fn new(config: &ArchiveConfig) -> Result<Self, HistoryError> {
        if config.bucket.is_empty() {
            return Err(HistoryError::ConfigError {
                reason: "archive.bucket must be set".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| HistoryError::ArchiveError {
                reason: format!("failed to build http client: {}", e),
            })?;

        let mut base_url = format!(
            "{}/{}",
            config.endpoint.trim_end_matches('/'),
            config.bucket.trim_matches('/')
        );
        let prefix = config.core_directory.trim_matches('/');
        if !prefix.is_empty() {
            base_url.push('/');
            base_url.push_str(prefix);
        }

        Ok(Self { client, base_url })
    }

    pub fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArchiveSource for S3Archive {
    fn backend_tag(&self) -> &'static str {
        "s3"
    }

    #[instrument(name = "archive_s3_fetch", skip(self))]
    async fn fetch(&self, path: &str) -> Result<Option<Bytes>, HistoryError> {
        let url = self.object_url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HistoryError::ArchiveError {
                reason: format!("GET {} failed: {}", url, e),
            })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Archive response");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HistoryError::ArchiveError {
                reason: format!("GET {} returned {}", url, status),
            });
        }

        response
            .bytes()
            .await
            .map(Some)
            .map_err(|e| HistoryError::ArchiveError {
                reason: format!("reading body of {} failed: {}", url, e),
            })
    }
}
