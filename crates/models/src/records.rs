use crate::FileSequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A payment of the tracked asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub source: String,
    pub destination: String,
    /// Amount in stroops (1e-7 units).
    pub amount: i64,
    pub memo_text: Option<String>,
    pub tx_hash: String,
    pub op_index: u32,
    pub ledger_sequence: u32,
    pub time: DateTime<Utc>,
}

/// A change-trust operation on the tracked asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trustline {
    pub source: String,
    pub limit: i64,
    pub memo_text: Option<String>,
    pub tx_hash: String,
    pub op_index: u32,
    pub ledger_sequence: u32,
    pub time: DateTime<Utc>,
}

/// Where the collector stands. `processed == false` means `file` itself is still pending,
/// which is how a freshly bootstrapped database points at its first checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorCursor {
    pub file: FileSequence,
    pub processed: bool,
}

impl CollectorCursor {
    pub fn pending(file: FileSequence) -> Self {
        Self {
            file,
            processed: false,
        }
    }

    pub fn processed(file: FileSequence) -> Self {
        Self {
            file,
            processed: true,
        }
    }

    pub fn next_file(&self) -> Result<FileSequence, crate::HistoryError> {
        if self.processed {
            self.file.next()
        } else {
            Ok(self.file)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatus {
    pub last_file: Option<FileSequence>,
    pub next_file: Option<FileSequence>,
}

impl CollectorStatus {
    pub fn from_cursor(cursor: Option<CollectorCursor>) -> Self {
        match cursor {
            Some(cursor) => Self {
                last_file: cursor.processed.then_some(cursor.file),
                next_file: cursor.next_file().ok(),
            },
            None => Self {
                last_file: None,
                next_file: None,
            },
        }
    }
}

/// Result of processing one checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointSummary {
    pub file: FileSequence,
    pub ledgers: usize,
    pub transactions: usize,
    pub payments: usize,
    pub trustlines: usize,
}

pub const DEFAULT_QUERY_LIMIT: u32 = 20;
pub const MAX_QUERY_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
    pub source: String,
    pub limit: u32,
}

impl AccountQuery {
    pub fn new(source: impl Into<String>, limit: Option<u32>) -> Self {
        Self {
            source: source.into(),
            limit: limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_next_file() {
        let file = FileSequence::new(0x3f);
        assert_eq!(CollectorCursor::pending(file).next_file().unwrap(), file);
        assert_eq!(
            CollectorCursor::processed(file).next_file().unwrap(),
            FileSequence::new(0x7f)
        );
    }

    #[test]
    fn test_status_from_cursor() {
        let status = CollectorStatus::from_cursor(Some(CollectorCursor::pending(FileSequence::new(0x3f))));
        assert_eq!(status.last_file, None);
        assert_eq!(status.next_file, Some(FileSequence::new(0x3f)));

        let status = CollectorStatus::from_cursor(None);
        assert!(status.last_file.is_none() && status.next_file.is_none());
    }

    #[test]
    fn test_query_limit_is_clamped() {
        assert_eq!(AccountQuery::new("G", None).limit, 20);
        assert_eq!(AccountQuery::new("G", Some(0)).limit, 1);
        assert_eq!(AccountQuery::new("G", Some(5000)).limit, 1000);
    }
}
