use history_models::FileSequence;
use history_xdr::{
    stream, AccountId, Asset, ChangeTrustOp, DecoratedSignature, FeeBumpTransaction, Hash,
    LedgerHeader, LedgerHeaderHistoryEntry, Memo, MuxedAccount, Operation, OperationBody,
    PaymentOp, Preconditions, StellarValue, Transaction, TransactionEnvelope,
    TransactionHistoryEntry, TransactionSet,
};

/// Close time of ledger 1 in generated fixtures: 2019-01-01T00:00:00Z.
pub const GENESIS_CLOSE_TIME: u64 = 1_546_300_800;

/// Seconds between generated ledgers.
pub const LEDGER_INTERVAL: u64 = 5;

pub const ASSET_CODE: &str = "KIN";

/// Deterministic account whose key is 32 copies of `n`.
pub fn account(n: u8) -> AccountId {
    AccountId([n; 32])
}

pub fn issuer() -> AccountId {
    account(9)
}

/// The asset generated fixtures pay with.
pub fn tracked_asset() -> Asset {
    Asset::CreditAlphanum4 {
        code: *b"KIN\0",
        issuer: issuer(),
    }
}

pub fn other_asset() -> Asset {
    Asset::CreditAlphanum4 {
        code: *b"XLM2",
        issuer: account(8),
    }
}

pub fn close_time_of(ledger_seq: u32) -> u64 {
    GENESIS_CLOSE_TIME + (ledger_seq as u64).saturating_sub(1) * LEDGER_INTERVAL
}

pub fn ledger_entry(ledger_seq: u32) -> LedgerHeaderHistoryEntry {
    let mut hash = [0u8; 32];
    hash[..4].copy_from_slice(&ledger_seq.to_be_bytes());
    LedgerHeaderHistoryEntry {
        hash: Hash(hash),
        header: LedgerHeader {
            ledger_version: 11,
            previous_ledger_hash: Hash([0; 32]),
            scp_value: StellarValue {
                tx_set_hash: Hash([1; 32]),
                close_time: close_time_of(ledger_seq),
                upgrades: Vec::new(),
                signature: None,
            },
            tx_set_result_hash: Hash([2; 32]),
            bucket_list_hash: Hash([3; 32]),
            ledger_seq,
            total_coins: 1_000_000_000_000,
            fee_pool: 0,
            inflation_seq: 0,
            id_pool: 0,
            base_fee: 100,
            base_reserve: 5_000_000,
            max_tx_set_size: 100,
            skip_list: [Hash([0; 32]), Hash([0; 32]), Hash([0; 32]), Hash([0; 32])],
            flags: None,
        },
    }
}

pub fn payment(source: Option<AccountId>, destination: AccountId, asset: Asset, amount: i64) -> Operation {
    Operation {
        source_account: source.map(MuxedAccount::from),
        body: OperationBody::Payment(PaymentOp {
            destination: MuxedAccount::from(destination),
            asset,
            amount,
        }),
    }
}

pub fn change_trust(source: Option<AccountId>, line: Asset, limit: i64) -> Operation {
    Operation {
        source_account: source.map(MuxedAccount::from),
        body: OperationBody::ChangeTrust(ChangeTrustOp { line, limit }),
    }
}

pub fn transaction(source: AccountId, seq_num: i64, memo: Memo, operations: Vec<Operation>) -> Transaction {
    Transaction {
        source_account: MuxedAccount::from(source),
        fee: 100 * operations.len().max(1) as u32,
        seq_num,
        cond: Preconditions::None,
        memo,
        operations,
    }
}

pub fn text_memo(text: &str) -> Memo {
    Memo::Text(text.as_bytes().to_vec())
}

fn signature() -> Vec<DecoratedSignature> {
    vec![DecoratedSignature {
        hint: [0, 0, 0, 1],
        signature: vec![7; 64],
    }]
}

pub fn v1_envelope(tx: Transaction) -> TransactionEnvelope {
    TransactionEnvelope::V1 {
        tx,
        signatures: signature(),
    }
}

/// Legacy envelope; the source must be a plain ed25519 account.
pub fn v0_envelope(tx: Transaction) -> TransactionEnvelope {
    TransactionEnvelope::V0 {
        tx,
        signatures: signature(),
    }
}

pub fn fee_bump_envelope(fee_source: AccountId, inner: Transaction) -> TransactionEnvelope {
    TransactionEnvelope::FeeBump {
        tx: FeeBumpTransaction {
            fee_source: MuxedAccount::from(fee_source),
            fee: 400,
            inner_tx: inner,
            inner_signatures: signature(),
        },
        signatures: signature(),
    }
}

pub fn tx_entry(ledger_seq: u32, txs: Vec<TransactionEnvelope>) -> TransactionHistoryEntry {
    TransactionHistoryEntry {
        ledger_seq,
        tx_set: TransactionSet {
            previous_ledger_hash: Hash([0; 32]),
            txs,
        },
    }
}

/// The contents of one checkpoint: a header for every ledger and the non-empty transaction sets.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub file: FileSequence,
    pub ledgers: Vec<LedgerHeaderHistoryEntry>,
    pub transactions: Vec<TransactionHistoryEntry>,
}

impl Checkpoint {
    /// A checkpoint with headers for all of its ledgers and no transactions.
    pub fn empty(file: FileSequence) -> Self {
        let ledgers = (file.first_ledger()..=file.last_ledger())
            .map(ledger_entry)
            .collect();
        Self {
            file,
            ledgers,
            transactions: Vec::new(),
        }
    }

    pub fn with_transactions(mut self, ledger_seq: u32, txs: Vec<TransactionEnvelope>) -> Self {
        self.transactions.push(tx_entry(ledger_seq, txs));
        self
    }

    pub fn ledger_bytes(&self) -> Vec<u8> {
        stream::write_file(&self.ledgers).expect("gzip ledger file")
    }

    pub fn transactions_bytes(&self) -> Vec<u8> {
        stream::write_file(&self.transactions).expect("gzip transactions file")
    }
}

/// One payment and one trustline of the tracked asset, plus noise that must be ignored.
pub fn sample_checkpoint(file: FileSequence) -> Checkpoint {
    let ledger = file.first_ledger() + 1;
    let payer = account(1);
    let payee = account(2);

    let pay = transaction(
        payer,
        1,
        text_memo("1-test-order"),
        vec![
            payment(None, payee, tracked_asset(), 150_000),
            payment(None, payee, other_asset(), 1),
            payment(None, payee, Asset::Native, 1),
        ],
    );
    let trust = transaction(
        payee,
        1,
        Memo::None,
        vec![
            change_trust(None, tracked_asset(), i64::MAX),
            change_trust(None, other_asset(), 1),
        ],
    );

    Checkpoint::empty(file).with_transactions(ledger, vec![v1_envelope(pay), v1_envelope(trust)])
}
