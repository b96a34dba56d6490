//! Filtering of decoded checkpoint files down to the tracked asset's operations.

use chrono::{DateTime, Utc};
use history_models::{HistoryError, Payment, Trustline};
use history_xdr::{
    Asset, LedgerHeaderHistoryEntry, NetworkId, OperationBody, TransactionHistoryEntry,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub payments: Vec<Payment>,
    pub trustlines: Vec<Trustline>,
    pub transactions: usize,
}

/// Ledger sequence to close time (unix seconds).
pub fn close_times(ledgers: &[LedgerHeaderHistoryEntry]) -> HashMap<u32, u64> {
    ledgers
        .iter()
        .map(|entry| (entry.header.ledger_seq, entry.header.scp_value.close_time))
        .collect()
}

fn close_time(seconds: u64) -> Result<DateTime<Utc>, HistoryError> {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or(HistoryError::InvalidCloseTime {
            close_time: seconds,
        })
}

/// Postgres text cannot hold NUL, and memos are zero-padded by some clients.
fn memo_text(memo: &history_xdr::Memo) -> Option<String> {
    memo.text().map(|text| text.replace('\0', ""))
}

/// Payments and change-trust operations on `asset`, in file order.
///
/// The operation's own source account wins over the transaction's; muxed accounts are
/// reported by their underlying key. Fee-bump envelopes contribute their inner transaction.
pub fn extract_operations(
    entries: &[TransactionHistoryEntry],
    close_times: &HashMap<u32, u64>,
    asset: &Asset,
    network: &NetworkId,
    file: &str,
) -> Result<Extracted, HistoryError> {
    let mut out = Extracted::default();

    for entry in entries {
        let seconds = close_times
            .get(&entry.ledger_seq)
            .copied()
            .ok_or_else(|| HistoryError::MissingLedger {
                ledger_seq: entry.ledger_seq,
                file: file.to_string(),
            })?;
        let time = close_time(seconds)?;

        for envelope in &entry.tx_set.txs {
            out.transactions += 1;
            let tx = envelope.transaction();

            let relevant = tx.operations.iter().any(|op| match &op.body {
                OperationBody::Payment(p) => p.asset == *asset,
                OperationBody::ChangeTrust(c) => c.line == *asset,
                _ => false,
            });
            if !relevant {
                continue;
            }

            let tx_hash = envelope.hash(network).to_hex();
            let memo = memo_text(&tx.memo);

            for (index, op) in tx.operations.iter().enumerate() {
                let source = op
                    .source_account
                    .unwrap_or(tx.source_account)
                    .account_id()
                    .to_strkey();
                match &op.body {
                    OperationBody::Payment(p) if p.asset == *asset => out.payments.push(Payment {
                        source,
                        destination: p.destination.account_id().to_strkey(),
                        amount: p.amount,
                        memo_text: memo.clone(),
                        tx_hash: tx_hash.clone(),
                        op_index: index as u32,
                        ledger_sequence: entry.ledger_seq,
                        time,
                    }),
                    OperationBody::ChangeTrust(c) if c.line == *asset => {
                        out.trustlines.push(Trustline {
                            source,
                            limit: c.limit,
                            memo_text: memo.clone(),
                            tx_hash: tx_hash.clone(),
                            op_index: index as u32,
                            ledger_sequence: entry.ledger_seq,
                            time,
                        })
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use history_testsupport::{
        account, change_trust, fee_bump_envelope, ledger_entry, other_asset, payment,
        text_memo, tracked_asset, transaction, tx_entry, v0_envelope, v1_envelope,
    };
    use history_xdr::{Memo, MuxedAccount, TransactionEnvelope, TESTNET_PASSPHRASE};

    fn network() -> NetworkId {
        NetworkId::from_passphrase(TESTNET_PASSPHRASE)
    }

    fn times(ledgers: &[u32]) -> HashMap<u32, u64> {
        let entries: Vec<_> = ledgers.iter().map(|seq| ledger_entry(*seq)).collect();
        close_times(&entries)
    }

    fn run(envelopes: Vec<TransactionEnvelope>) -> Extracted {
        extract_operations(
            &[tx_entry(10, envelopes)],
            &times(&[10]),
            &tracked_asset(),
            &network(),
            "0000003f",
        )
        .unwrap()
    }

    #[test]
    fn test_keeps_only_tracked_asset() {
        let tx = transaction(
            account(1),
            1,
            text_memo("order-1"),
            vec![
                payment(None, account(2), other_asset(), 5),
                payment(None, account(2), tracked_asset(), 150_000),
                change_trust(None, other_asset(), 1),
                change_trust(None, tracked_asset(), 1_000),
            ],
        );
        let envelope = v1_envelope(tx);
        let expected_hash = envelope.hash(&network()).to_hex();
        let out = run(vec![envelope]);

        assert_eq!(out.transactions, 1);
        assert_eq!(out.payments.len(), 1);
        let p = &out.payments[0];
        assert_eq!(p.source, account(1).to_strkey());
        assert_eq!(p.destination, account(2).to_strkey());
        assert_eq!(p.amount, 150_000);
        assert_eq!(p.memo_text.as_deref(), Some("order-1"));
        assert_eq!(p.op_index, 1);
        assert_eq!(p.tx_hash, expected_hash);
        assert_eq!(p.ledger_sequence, 10);
        assert_eq!(p.time.timestamp(), ledger_entry(10).header.scp_value.close_time as i64);

        assert_eq!(out.trustlines.len(), 1);
        assert_eq!(out.trustlines[0].limit, 1_000);
        assert_eq!(out.trustlines[0].op_index, 3);
    }

    #[test]
    fn test_operation_source_overrides_transaction_source() {
        let tx = transaction(
            account(1),
            1,
            Memo::None,
            vec![
                payment(Some(account(3)), account(2), tracked_asset(), 1),
                payment(None, account(2), tracked_asset(), 2),
            ],
        );
        let out = run(vec![v1_envelope(tx)]);
        assert_eq!(out.payments[0].source, account(3).to_strkey());
        assert_eq!(out.payments[1].source, account(1).to_strkey());
        assert!(out.payments.iter().all(|p| p.memo_text.is_none()));
    }

    #[test]
    fn test_muxed_accounts_reduce_to_their_key() {
        let mut tx = transaction(
            account(1),
            1,
            Memo::Id(7),
            vec![payment(None, account(2), tracked_asset(), 1)],
        );
        tx.source_account = MuxedAccount::MuxedEd25519 {
            id: 42,
            account: account(1),
        };
        if let OperationBody::Payment(p) = &mut tx.operations[0].body {
            p.destination = MuxedAccount::MuxedEd25519 {
                id: 9,
                account: account(2),
            };
        }
        let out = run(vec![v1_envelope(tx)]);
        assert_eq!(out.payments[0].source, account(1).to_strkey());
        assert_eq!(out.payments[0].destination, account(2).to_strkey());
        assert_eq!(out.payments[0].memo_text, None);
    }

    #[test]
    fn test_fee_bump_and_v0_envelopes() {
        let inner = transaction(
            account(4),
            1,
            Memo::None,
            vec![payment(None, account(2), tracked_asset(), 1)],
        );
        let bump = fee_bump_envelope(account(5), inner.clone());
        let bump_hash = bump.hash(&network()).to_hex();
        let out = run(vec![bump, v0_envelope(inner)]);

        assert_eq!(out.transactions, 2);
        assert_eq!(out.payments.len(), 2);
        assert_eq!(out.payments[0].source, account(4).to_strkey());
        assert_eq!(out.payments[0].tx_hash, bump_hash);
        assert_ne!(out.payments[1].tx_hash, bump_hash);
    }

    #[test]
    fn test_memo_nul_bytes_are_stripped() {
        let tx = transaction(
            account(1),
            1,
            Memo::Text(b"abc\0\0".to_vec()),
            vec![payment(None, account(2), tracked_asset(), 1)],
        );
        assert_eq!(run(vec![v1_envelope(tx)]).payments[0].memo_text.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_ledger_is_an_error() {
        let tx = transaction(account(1), 1, Memo::None, vec![]);
        let err = extract_operations(
            &[tx_entry(11, vec![v1_envelope(tx)])],
            &times(&[10]),
            &tracked_asset(),
            &network(),
            "0000003f",
        )
        .unwrap_err();
        assert!(matches!(err, HistoryError::MissingLedger { ledger_seq: 11, .. }));
    }

    #[test]
    fn test_unrepresentable_close_time() {
        assert!(matches!(
            close_time(u64::MAX),
            Err(HistoryError::InvalidCloseTime { .. })
        ));
    }
}
