use crate::ArchiveSource;
use async_trait::async_trait;
use bytes::Bytes;
use history_models::HistoryError;
use std::io::ErrorKind;
use std::path::PathBuf;

/// An archive mirrored onto the local filesystem with the same directory layout.
pub struct LocalArchive {
    root: PathBuf,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArchiveSource for LocalArchive {
    fn backend_tag(&self) -> &'static str {
        "local"
    }

    async fn fetch(&self, path: &str) -> Result<Option<Bytes>, HistoryError> {
        if path.split('/').any(|part| part == "..") {
            return Err(HistoryError::ArchiveError {
                reason: format!("path traversal blocked: {}", path),
            });
        }
        match tokio::fs::read(self.root.join(path)).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::ArchiveError {
                reason: format!("read {} failed: {}", path, e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("ledger/00/00/00")).unwrap();
        std::fs::write(dir.path().join("ledger/00/00/00/ledger-0000003f.xdr.gz"), b"abc").unwrap();

        let archive = LocalArchive::new(dir.path());
        let found = archive
            .fetch("ledger/00/00/00/ledger-0000003f.xdr.gz")
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some(&b"abc"[..]));
        assert!(archive
            .fetch("ledger/00/00/00/ledger-0000007f.xdr.gz")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rejects_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LocalArchive::new(dir.path());
        assert!(archive.fetch("../etc/passwd").await.is_err());
    }
}
