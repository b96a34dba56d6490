use super::common::{AccountId, DecoratedSignature, Hash, Memo, MuxedAccount, SignerKey};
use super::operation::Operation;
use crate::hash::{sha256, NetworkId};
use crate::reader::{Decode, XdrReader};
use crate::writer::{Encode, XdrWriter};
use crate::XdrError;
use serde::Serialize;

pub const ENVELOPE_TYPE_TX_V0: i32 = 0;
pub const ENVELOPE_TYPE_TX: i32 = 2;
pub const ENVELOPE_TYPE_TX_FEE_BUMP: i32 = 5;

const MAX_OPS_PER_TX: usize = 100;
const MAX_SIGNATURES: usize = 20;

const PRECOND_NONE: i32 = 0;
const PRECOND_TIME: i32 = 1;
const PRECOND_V2: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl Decode for TimeBounds {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(TimeBounds {
            min_time: r.read_u64()?,
            max_time: r.read_u64()?,
        })
    }
}

impl Encode for TimeBounds {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_u64(self.min_time);
        w.write_u64(self.max_time);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerBounds {
    pub min_ledger: u32,
    pub max_ledger: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreconditionsV2 {
    pub time_bounds: Option<TimeBounds>,
    pub ledger_bounds: Option<LedgerBounds>,
    pub min_seq_num: Option<i64>,
    pub min_seq_age: u64,
    pub min_seq_ledger_gap: u32,
    pub extra_signers: Vec<SignerKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Preconditions {
    None,
    Time(TimeBounds),
    V2(PreconditionsV2),
}

impl Decode for Preconditions {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            PRECOND_NONE => Ok(Preconditions::None),
            PRECOND_TIME => Ok(Preconditions::Time(TimeBounds::decode(r)?)),
            PRECOND_V2 => Ok(Preconditions::V2(PreconditionsV2 {
                time_bounds: r.read_option(TimeBounds::decode)?,
                ledger_bounds: r.read_option(|r| {
                    Ok(LedgerBounds {
                        min_ledger: r.read_u32()?,
                        max_ledger: r.read_u32()?,
                    })
                })?,
                min_seq_num: r.read_option(|r| r.read_i64())?,
                min_seq_age: r.read_u64()?,
                min_seq_ledger_gap: r.read_u32()?,
                extra_signers: r.read_array(2, SignerKey::decode)?,
            })),
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "PreconditionType",
                value,
            }),
        }
    }
}

impl Encode for Preconditions {
    fn encode(&self, w: &mut XdrWriter) {
        match self {
            Preconditions::None => w.write_i32(PRECOND_NONE),
            Preconditions::Time(tb) => {
                w.write_i32(PRECOND_TIME);
                tb.encode(w);
            }
            Preconditions::V2(v2) => {
                w.write_i32(PRECOND_V2);
                w.write_option(v2.time_bounds.as_ref(), |w, v| v.encode(w));
                w.write_option(v2.ledger_bounds.as_ref(), |w, v| {
                    w.write_u32(v.min_ledger);
                    w.write_u32(v.max_ledger);
                });
                w.write_option(v2.min_seq_num.as_ref(), |w, v| w.write_i64(*v));
                w.write_u64(v2.min_seq_age);
                w.write_u32(v2.min_seq_ledger_gap);
                w.write_array(&v2.extra_signers, |w, s| s.encode(w));
            }
        }
    }
}

/// A transaction body. Envelopes of every version decode into this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub source_account: MuxedAccount,
    pub fee: u32,
    pub seq_num: i64,
    pub cond: Preconditions,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Decodes the legacy `TransactionV0` layout (raw ed25519 source, optional time bounds).
    fn decode_v0(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let source_account = MuxedAccount::Ed25519(AccountId(r.read_fixed()?));
        let fee = r.read_u32()?;
        let seq_num = r.read_i64()?;
        let cond = match r.read_option(TimeBounds::decode)? {
            Some(tb) => Preconditions::Time(tb),
            None => Preconditions::None,
        };
        let memo = Memo::decode(r)?;
        let operations = r.read_array(MAX_OPS_PER_TX, Operation::decode)?;
        r.read_empty_ext("TransactionV0Ext")?;
        Ok(Transaction {
            source_account,
            fee,
            seq_num,
            cond,
            memo,
            operations,
        })
    }

    fn encode_v0(&self, w: &mut XdrWriter) {
        w.write_fixed(&self.source_account.account_id().0);
        w.write_u32(self.fee);
        w.write_i64(self.seq_num);
        let time_bounds = match &self.cond {
            Preconditions::Time(tb) => Some(tb),
            Preconditions::V2(v2) => v2.time_bounds.as_ref(),
            Preconditions::None => None,
        };
        w.write_option(time_bounds, |w, v| v.encode(w));
        self.memo.encode(w);
        w.write_array(&self.operations, |w, op| op.encode(w));
        w.write_i32(0);
    }
}

impl Decode for Transaction {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let tx = Transaction {
            source_account: MuxedAccount::decode(r)?,
            fee: r.read_u32()?,
            seq_num: r.read_i64()?,
            cond: Preconditions::decode(r)?,
            memo: Memo::decode(r)?,
            operations: r.read_array(MAX_OPS_PER_TX, Operation::decode)?,
        };
        r.read_empty_ext("TransactionExt")?;
        Ok(tx)
    }
}

impl Encode for Transaction {
    fn encode(&self, w: &mut XdrWriter) {
        self.source_account.encode(w);
        w.write_u32(self.fee);
        w.write_i64(self.seq_num);
        self.cond.encode(w);
        self.memo.encode(w);
        w.write_array(&self.operations, |w, op| op.encode(w));
        w.write_i32(0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeBumpTransaction {
    pub fee_source: MuxedAccount,
    pub fee: i64,
    pub inner_tx: Transaction,
    pub inner_signatures: Vec<DecoratedSignature>,
}

impl Decode for FeeBumpTransaction {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let fee_source = MuxedAccount::decode(r)?;
        let fee = r.read_i64()?;
        match r.read_i32()? {
            ENVELOPE_TYPE_TX => {}
            value => {
                return Err(XdrError::UnknownDiscriminant {
                    type_name: "FeeBumpInnerTx",
                    value,
                })
            }
        }
        let inner_tx = Transaction::decode(r)?;
        let inner_signatures = r.read_array(MAX_SIGNATURES, DecoratedSignature::decode)?;
        r.read_empty_ext("FeeBumpTransactionExt")?;
        Ok(FeeBumpTransaction {
            fee_source,
            fee,
            inner_tx,
            inner_signatures,
        })
    }
}

impl Encode for FeeBumpTransaction {
    fn encode(&self, w: &mut XdrWriter) {
        self.fee_source.encode(w);
        w.write_i64(self.fee);
        w.write_i32(ENVELOPE_TYPE_TX);
        self.inner_tx.encode(w);
        w.write_array(&self.inner_signatures, |w, s| s.encode(w));
        w.write_i32(0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionEnvelope {
    V0 {
        tx: Transaction,
        signatures: Vec<DecoratedSignature>,
    },
    V1 {
        tx: Transaction,
        signatures: Vec<DecoratedSignature>,
    },
    FeeBump {
        tx: FeeBumpTransaction,
        signatures: Vec<DecoratedSignature>,
    },
}

impl TransactionEnvelope {
    /// The transaction carrying the operations; the inner transaction for fee bumps.
    pub fn transaction(&self) -> &Transaction {
        match self {
            TransactionEnvelope::V0 { tx, .. } | TransactionEnvelope::V1 { tx, .. } => tx,
            TransactionEnvelope::FeeBump { tx, .. } => &tx.inner_tx,
        }
    }

    /// Network hash identifying the transaction.
    ///
    /// V0 envelopes hash as their V1 equivalent, so the same transaction has the same id
    /// regardless of the envelope version it was submitted with.
    pub fn hash(&self, network: &NetworkId) -> Hash {
        let mut w = XdrWriter::new();
        network.0.encode(&mut w);
        match self {
            TransactionEnvelope::V0 { tx, .. } | TransactionEnvelope::V1 { tx, .. } => {
                w.write_i32(ENVELOPE_TYPE_TX);
                tx.encode(&mut w);
            }
            TransactionEnvelope::FeeBump { tx, .. } => {
                w.write_i32(ENVELOPE_TYPE_TX_FEE_BUMP);
                tx.encode(&mut w);
            }
        }
        sha256(&w.into_bytes())
    }
}

impl Decode for TransactionEnvelope {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            ENVELOPE_TYPE_TX_V0 => Ok(TransactionEnvelope::V0 {
                tx: Transaction::decode_v0(r)?,
                signatures: r.read_array(MAX_SIGNATURES, DecoratedSignature::decode)?,
            }),
            ENVELOPE_TYPE_TX => Ok(TransactionEnvelope::V1 {
                tx: Transaction::decode(r)?,
                signatures: r.read_array(MAX_SIGNATURES, DecoratedSignature::decode)?,
            }),
            ENVELOPE_TYPE_TX_FEE_BUMP => Ok(TransactionEnvelope::FeeBump {
                tx: FeeBumpTransaction::decode(r)?,
                signatures: r.read_array(MAX_SIGNATURES, DecoratedSignature::decode)?,
            }),
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "EnvelopeType",
                value,
            }),
        }
    }
}

impl Encode for TransactionEnvelope {
    fn encode(&self, w: &mut XdrWriter) {
        match self {
            TransactionEnvelope::V0 { tx, signatures } => {
                w.write_i32(ENVELOPE_TYPE_TX_V0);
                tx.encode_v0(w);
                w.write_array(signatures, |w, s| s.encode(w));
            }
            TransactionEnvelope::V1 { tx, signatures } => {
                w.write_i32(ENVELOPE_TYPE_TX);
                tx.encode(w);
                w.write_array(signatures, |w, s| s.encode(w));
            }
            TransactionEnvelope::FeeBump { tx, signatures } => {
                w.write_i32(ENVELOPE_TYPE_TX_FEE_BUMP);
                tx.encode(w);
                w.write_array(signatures, |w, s| s.encode(w));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes};

    fn sample_tx() -> Transaction {
        Transaction {
            source_account: MuxedAccount::Ed25519(AccountId([1u8; 32])),
            fee: 100,
            seq_num: 7,
            cond: Preconditions::Time(TimeBounds {
                min_time: 0,
                max_time: 10,
            }),
            memo: Memo::Text(b"hello".to_vec()),
            operations: vec![],
        }
    }

    #[test]
    fn test_v0_and_v1_envelopes_share_a_hash() {
        let network = NetworkId::from_passphrase("Test SDF Network ; September 2015");
        let v0 = TransactionEnvelope::V0 {
            tx: sample_tx(),
            signatures: vec![],
        };
        let v1 = TransactionEnvelope::V1 {
            tx: sample_tx(),
            signatures: vec![],
        };
        assert_eq!(v0.hash(&network), v1.hash(&network));
        assert_ne!(
            v0.hash(&network),
            v0.hash(&NetworkId::from_passphrase("another network"))
        );
    }

    #[test]
    fn test_v0_layout_matches_v1_after_key_type_prefix() {
        let v0 = to_bytes(&TransactionEnvelope::V0 {
            tx: sample_tx(),
            signatures: vec![],
        });
        let v1 = to_bytes(&TransactionEnvelope::V1 {
            tx: sample_tx(),
            signatures: vec![],
        });
        // v1 = [2][0 key type][key...], v0 = [0][key...]
        assert_eq!(&v0[4..], &v1[8..]);

        let decoded: TransactionEnvelope = from_bytes(&v0).unwrap();
        assert!(matches!(decoded, TransactionEnvelope::V0 { .. }));
        assert_eq!(decoded.transaction(), &sample_tx());
    }

    #[test]
    fn test_fee_bump_exposes_inner_transaction() {
        let envelope = TransactionEnvelope::FeeBump {
            tx: FeeBumpTransaction {
                fee_source: MuxedAccount::Ed25519(AccountId([2u8; 32])),
                fee: 400,
                inner_tx: sample_tx(),
                inner_signatures: vec![DecoratedSignature {
                    hint: [1, 2, 3, 4],
                    signature: vec![5; 64],
                }],
            },
            signatures: vec![],
        };
        let decoded: TransactionEnvelope = from_bytes(&to_bytes(&envelope)).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.transaction().seq_num, 7);
    }

    #[test]
    fn test_rejects_soroban_extension() {
        let mut bytes = to_bytes(&TransactionEnvelope::V1 {
            tx: sample_tx(),
            signatures: vec![],
        });
        // Replace the ext discriminant (last 4 bytes before the empty signature array).
        let ext_at = bytes.len() - 8;
        bytes[ext_at + 3] = 1;
        assert_eq!(
            from_bytes::<TransactionEnvelope>(&bytes).unwrap_err(),
            XdrError::UnknownDiscriminant {
                type_name: "TransactionExt",
                value: 1
            }
        );
    }
}
