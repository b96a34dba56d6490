use crate::HistoryStore;
use async_trait::async_trait;
use history_models::{AccountQuery, CollectorCursor, FileSequence, HistoryError, Payment, Trustline};
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    cursor: Option<CollectorCursor>,
    payments: Vec<Payment>,
    trustlines: Vec<Trustline>,
    payment_keys: HashSet<(String, u32)>,
    trustline_keys: HashSet<(String, u32)>,
}

/// In-process store with the same ordering and idempotency rules as [`crate::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(cursor: CollectorCursor) -> Self {
        Self {
            inner: RwLock::new(Inner {
                cursor: Some(cursor),
                ..Inner::default()
            }),
        }
    }

    pub async fn payment_count(&self) -> usize {
        self.inner.read().await.payments.len()
    }

    pub async fn trustline_count(&self) -> usize {
        self.inner.read().await.trustlines.len()
    }
}

/// Newest first: highest ledger, then latest inserted.
fn newest_first<'a, T: 'a>(
    rows: impl DoubleEndedIterator<Item = &'a T>,
    ledger: impl Fn(&T) -> u32,
    limit: u32,
) -> Vec<T>
where
    T: Clone,
{
    let mut matched: Vec<T> = rows.rev().cloned().collect();
    matched.sort_by_key(|row| std::cmp::Reverse(ledger(row)));
    matched.truncate(limit as usize);
    matched
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn cursor(&self) -> Result<Option<CollectorCursor>, HistoryError> {
        Ok(self.inner.read().await.cursor)
    }

    async fn seed_cursor(&self, file: FileSequence) -> Result<(), HistoryError> {
        self.inner.write().await.cursor = Some(CollectorCursor::pending(file));
        Ok(())
    }

    async fn commit_checkpoint(
        &self,
        file: FileSequence,
        payments: &[Payment],
        trustlines: &[Trustline],
    ) -> Result<(), HistoryError> {
        let mut inner = self.inner.write().await;
        for payment in payments {
            if inner
                .payment_keys
                .insert((payment.tx_hash.clone(), payment.op_index))
            {
                inner.payments.push(payment.clone());
            }
        }
        for trustline in trustlines {
            if inner
                .trustline_keys
                .insert((trustline.tx_hash.clone(), trustline.op_index))
            {
                inner.trustlines.push(trustline.clone());
            }
        }
        inner.cursor = Some(CollectorCursor::processed(file));
        Ok(())
    }

    async fn payments_by_source(&self, query: &AccountQuery) -> Result<Vec<Payment>, HistoryError> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner.payments.iter().filter(|p| p.source == query.source),
            |p| p.ledger_sequence,
            query.limit,
        ))
    }

    async fn payment_by_hash(&self, tx_hash: &str) -> Result<Option<Payment>, HistoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .iter()
            .filter(|p| p.tx_hash == tx_hash)
            .min_by_key(|p| p.op_index)
            .cloned())
    }

    async fn trustlines_by_source(&self, query: &AccountQuery) -> Result<Vec<Trustline>, HistoryError> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner.trustlines.iter().filter(|t| t.source == query.source),
            |t| t.ledger_sequence,
            query.limit,
        ))
    }

    async fn ping(&self) -> Result<(), HistoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn payment(source: &str, tx: &str, op_index: u32, ledger: u32) -> Payment {
        Payment {
            source: source.to_string(),
            destination: "GDEST".to_string(),
            amount: 10,
            memo_text: None,
            tx_hash: tx.to_string(),
            op_index,
            ledger_sequence: ledger,
            time: DateTime::from_timestamp(1_546_300_800 + ledger as i64, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_commit_advances_cursor_and_dedupes() {
        let store = MemoryStore::new();
        assert!(store.cursor().await.unwrap().is_none());

        let file = FileSequence::new(0x3f);
        let rows = vec![payment("GA", "aa", 0, 10), payment("GA", "aa", 1, 10)];
        store.commit_checkpoint(file, &rows, &[]).await.unwrap();
        store.commit_checkpoint(file, &rows, &[]).await.unwrap();

        assert_eq!(store.payment_count().await, 2);
        assert_eq!(
            store.cursor().await.unwrap(),
            Some(CollectorCursor::processed(file))
        );
    }

    #[tokio::test]
    async fn test_payments_newest_first_with_limit() {
        let store = MemoryStore::new();
        let rows = vec![
            payment("GA", "t1", 0, 10),
            payment("GB", "t2", 0, 11),
            payment("GA", "t3", 0, 12),
            payment("GA", "t3", 1, 12),
        ];
        store
            .commit_checkpoint(FileSequence::new(0x3f), &rows, &[])
            .await
            .unwrap();

        let found = store
            .payments_by_source(&AccountQuery::new("GA", Some(2)))
            .await
            .unwrap();
        let keys: Vec<_> = found.iter().map(|p| (p.tx_hash.as_str(), p.op_index)).collect();
        assert_eq!(keys, vec![("t3", 1), ("t3", 0)]);
    }

    #[tokio::test]
    async fn test_payment_by_hash_returns_first_operation() {
        let store = MemoryStore::new();
        let rows = vec![payment("GA", "t1", 3, 10), payment("GA", "t1", 1, 10)];
        store
            .commit_checkpoint(FileSequence::new(0x3f), &rows, &[])
            .await
            .unwrap();

        assert_eq!(store.payment_by_hash("t1").await.unwrap().unwrap().op_index, 1);
        assert!(store.payment_by_hash("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_cursor_is_pending() {
        let store = MemoryStore::new();
        store.seed_cursor(FileSequence::new(0x7f)).await.unwrap();
        let cursor = store.cursor().await.unwrap().unwrap();
        assert!(!cursor.processed);
        assert_eq!(cursor.next_file().unwrap(), FileSequence::new(0x7f));
    }
}
