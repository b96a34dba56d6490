use crate::HistoryError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ledgers per checkpoint file.
pub const CHECKPOINT_FREQUENCY: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Ledger,
    Transactions,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Ledger => "ledger",
            FileCategory::Transactions => "transactions",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a checkpoint file: the last ledger it contains, as 8 lowercase hex digits.
///
/// Checkpoints are published every 64 ledgers, so valid names are `0000003f`,
/// `0000007f`, `000000bf`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSequence(u32);

impl FileSequence {
    pub fn new(value: u32) -> Self {
        FileSequence(value)
    }

    /// Checkpoint containing the given ledger.
    pub fn containing_ledger(ledger: u32) -> Self {
        FileSequence(ledger | (CHECKPOINT_FREQUENCY - 1))
    }

    pub fn parse(s: &str) -> Result<Self, HistoryError> {
        let invalid = || HistoryError::InvalidFileSequence {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.len() > 8
            || !trimmed.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(invalid());
        }
        u32::from_str_radix(trimmed, 16)
            .map(FileSequence)
            .map_err(|_| invalid())
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn name(&self) -> String {
        format!("{:08x}", self.0)
    }

    pub fn next(&self) -> Result<Self, HistoryError> {
        self.0
            .checked_add(CHECKPOINT_FREQUENCY)
            .map(FileSequence)
            .ok_or_else(|| HistoryError::InvalidFileSequence {
                value: format!("{} + {}", self.name(), CHECKPOINT_FREQUENCY),
            })
    }

    pub fn is_checkpoint(&self) -> bool {
        (self.0 as u64 + 1) % CHECKPOINT_FREQUENCY as u64 == 0
    }

    pub fn first_ledger(&self) -> u32 {
        self.0.saturating_sub(CHECKPOINT_FREQUENCY - 1).max(1)
    }

    pub fn last_ledger(&self) -> u32 {
        self.0
    }

    /// Object path below the archive root, e.g.
    /// `transactions/00/4c/93/transactions-004c93bf.xdr.gz`.
    pub fn archive_path(&self, category: FileCategory) -> String {
        let name = self.name();
        format!(
            "{category}/{}/{}/{}/{category}-{name}.xdr.gz",
            &name[0..2],
            &name[2..4],
            &name[4..6],
        )
    }
}

impl fmt::Display for FileSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for FileSequence {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileSequence::parse(s)
    }
}

impl Serialize for FileSequence {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for FileSequence {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        FileSequence::parse(&raw).map_err(serde::de::Error::custom)
    }
}
