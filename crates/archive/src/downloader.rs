use crate::ArchiveSource;
use bytes::Bytes;
use history_metrics::{MetricsService, TracingService};
use history_models::{ArchiveConfig, FileCategory, FileSequence, HistoryError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Wait after a missing object; checkpoints appear roughly every five minutes.
    pub not_found_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            not_found_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Both gzipped files of one checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointFiles {
    pub file: FileSequence,
    pub ledger: Bytes,
    pub transactions: Bytes,
}

pub struct Downloader {
    source: Arc<dyn ArchiveSource>,
    policy: RetryPolicy,
    metrics: Arc<MetricsService>,
}

impl Downloader {
    pub fn new(source: Arc<dyn ArchiveSource>, policy: RetryPolicy, metrics: Arc<MetricsService>) -> Self {
        Self {
            source,
            policy,
            metrics,
        }
    }

    /// Fetches one object, retrying up to `max_retries` times.
    ///
    /// A missing object is retried after `not_found_delay` since the checkpoint may not be
    /// published yet; any other failure is retried straight away.
    #[instrument(skip(self), fields(backend = self.source.backend_tag()))]
    pub async fn fetch(&self, path: &str) -> Result<Bytes, HistoryError> {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            info!(path = %path, attempt, "Downloading archive file");
            let outcome = self.source.fetch(path).await;
            let last = attempt >= max_attempts;

            match outcome {
                Ok(Some(bytes)) => {
                    info!(path = %path, bytes = bytes.len(), "Archive file downloaded");
                    return Ok(bytes);
                }
                Ok(None) if last => {
                    self.metrics.record_download_failure();
                    error!(path = %path, attempts = attempt, "Reached retry limit, file not found");
                    return Err(HistoryError::FileNotFound {
                        path: path.to_string(),
                    });
                }
                Err(e) if last => {
                    self.metrics.record_download_failure();
                    error!(path = %path, attempts = attempt, error = %e, "Reached retry limit");
                    return Err(HistoryError::DownloadFailed {
                        path: path.to_string(),
                        reason: e.to_string(),
                    });
                }
                Ok(None) => {
                    TracingService::log_download_retry(path, attempt, max_attempts, "not found");
                    self.metrics.record_download_retry();
                    tokio::time::sleep(self.policy.not_found_delay).await;
                }
                Err(e) => {
                    TracingService::log_download_retry(path, attempt, max_attempts, &e.to_string());
                    self.metrics.record_download_retry();
                }
            }
        }
    }

    /// Downloads the ledger file, then the transactions file, of one checkpoint.
    pub async fn fetch_checkpoint(&self, file: FileSequence) -> Result<CheckpointFiles, HistoryError> {
        let ledger = self.fetch(&file.archive_path(FileCategory::Ledger)).await?;
        let transactions = self
            .fetch(&file.archive_path(FileCategory::Transactions))
            .await?;
        Ok(CheckpointFiles {
            file,
            ledger,
            transactions,
        })
    }
}
