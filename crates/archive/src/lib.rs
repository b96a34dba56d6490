//! Access to a Stellar history archive, either an S3 bucket or a local mirror.

pub mod downloader;
pub mod local;
pub mod s3;

pub use downloader::*;
pub use local::*;
pub use s3::*;

use async_trait::async_trait;
use bytes::Bytes;
use history_models::{ArchiveConfig, HistoryError};
use std::sync::Arc;

#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Short name used in logs.
    fn backend_tag(&self) -> &'static str;

    /// Fetches an object by its path below the archive root. `Ok(None)` means the
    /// object does not exist (yet).
    async fn fetch(&self, path: &str) -> Result<Option<Bytes>, HistoryError>;
}

/// Picks the local mirror when `archive.local_dir` is set, S3 otherwise.
pub fn source_from_config(config: &ArchiveConfig) -> Result<Arc<dyn ArchiveSource>, HistoryError> {
    match &config.local_dir {
        Some(dir) => Ok(Arc::new(LocalArchive::new(dir))),
        None => Ok(Arc::new(S3Archive::new(config)?)),
    }
}
