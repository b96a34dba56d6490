//! Persistence of collected payments, trustlines and the collector cursor.

pub mod bootstrap;
pub mod memory;
pub mod migrations;
pub mod postgres;

pub use bootstrap::*;
pub use memory::*;
pub use postgres::*;

use async_trait::async_trait;
use history_models::{AccountQuery, CollectorCursor, FileSequence, HistoryError, Payment, Trustline};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The collector cursor, `None` when the database was never seeded.
    async fn cursor(&self) -> Result<Option<CollectorCursor>, HistoryError>;

    /// Points the cursor at a checkpoint that has not been processed yet.
    async fn seed_cursor(&self, file: FileSequence) -> Result<(), HistoryError>;

    /// Stores the rows of one checkpoint and marks it processed, atomically.
    /// Rows already present (same transaction hash and operation index) are skipped.
    async fn commit_checkpoint(
        &self,
        file: FileSequence,
        payments: &[Payment],
        trustlines: &[Trustline],
    ) -> Result<(), HistoryError>;

    /// Payments sent by an account, newest first.
    async fn payments_by_source(&self, query: &AccountQuery) -> Result<Vec<Payment>, HistoryError>;

    /// First payment operation of a transaction.
    async fn payment_by_hash(&self, tx_hash: &str) -> Result<Option<Payment>, HistoryError>;

    async fn trustlines_by_source(&self, query: &AccountQuery) -> Result<Vec<Trustline>, HistoryError>;

    async fn ping(&self) -> Result<(), HistoryError>;
}
