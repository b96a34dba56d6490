use super::common::{serialize_hex, AccountId, Hash};
use super::transaction::TransactionEnvelope;
use crate::reader::{Decode, XdrReader};
use crate::writer::{Encode, XdrWriter};
use crate::XdrError;
use serde::{Serialize, Serializer};

const STELLAR_VALUE_BASIC: i32 = 0;
const STELLAR_VALUE_SIGNED: i32 = 1;
const MAX_UPGRADES: usize = 6;
const MAX_UPGRADE_SIZE: usize = 128;

#[allow(clippy::ptr_arg)]
fn serialize_upgrades<S: Serializer>(upgrades: &Vec<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(upgrades.iter().map(hex::encode))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerCloseValueSignature {
    pub node_id: AccountId,
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

/// The value SCP agreed on for a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StellarValue {
    pub tx_set_hash: Hash,
    /// Unix seconds.
    pub close_time: u64,
    #[serde(serialize_with = "serialize_upgrades")]
    pub upgrades: Vec<Vec<u8>>,
    pub signature: Option<LedgerCloseValueSignature>,
}

impl Decode for StellarValue {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let tx_set_hash = Hash::decode(r)?;
        let close_time = r.read_u64()?;
        let upgrades = r.read_array(MAX_UPGRADES, |r| r.read_opaque(MAX_UPGRADE_SIZE))?;
        let signature = match r.read_i32()? {
            STELLAR_VALUE_BASIC => None,
            STELLAR_VALUE_SIGNED => Some(LedgerCloseValueSignature {
                node_id: AccountId::decode(r)?,
                signature: r.read_opaque(64)?,
            }),
            value => {
                return Err(XdrError::UnknownDiscriminant {
                    type_name: "StellarValueType",
                    value,
                })
            }
        };
        Ok(StellarValue {
            tx_set_hash,
            close_time,
            upgrades,
            signature,
        })
    }
}

impl Encode for StellarValue {
    fn encode(&self, w: &mut XdrWriter) {
        self.tx_set_hash.encode(w);
        w.write_u64(self.close_time);
        w.write_array(&self.upgrades, |w, u| w.write_opaque(u));
        match &self.signature {
            None => w.write_i32(STELLAR_VALUE_BASIC),
            Some(sig) => {
                w.write_i32(STELLAR_VALUE_SIGNED);
                sig.node_id.encode(w);
                w.write_opaque(&sig.signature);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerHeader {
    pub ledger_version: u32,
    pub previous_ledger_hash: Hash,
    pub scp_value: StellarValue,
    pub tx_set_result_hash: Hash,
    pub bucket_list_hash: Hash,
    pub ledger_seq: u32,
    pub total_coins: i64,
    pub fee_pool: i64,
    pub inflation_seq: u32,
    pub id_pool: u64,
    pub base_fee: u32,
    pub base_reserve: u32,
    pub max_tx_set_size: u32,
    pub skip_list: [Hash; 4],
    /// Present when the header carries the v1 extension.
    pub flags: Option<u32>,
}

impl Decode for LedgerHeader {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let ledger_version = r.read_u32()?;
        let previous_ledger_hash = Hash::decode(r)?;
        let scp_value = StellarValue::decode(r)?;
        let tx_set_result_hash = Hash::decode(r)?;
        let bucket_list_hash = Hash::decode(r)?;
        let ledger_seq = r.read_u32()?;
        let total_coins = r.read_i64()?;
        let fee_pool = r.read_i64()?;
        let inflation_seq = r.read_u32()?;
        let id_pool = r.read_u64()?;
        let base_fee = r.read_u32()?;
        let base_reserve = r.read_u32()?;
        let max_tx_set_size = r.read_u32()?;
        let skip_list = [
            Hash::decode(r)?,
            Hash::decode(r)?,
            Hash::decode(r)?,
            Hash::decode(r)?,
        ];
        let flags = match r.read_i32()? {
            0 => None,
            1 => {
                let flags = r.read_u32()?;
                r.read_empty_ext("LedgerHeaderExtensionV1Ext")?;
                Some(flags)
            }
            value => {
                return Err(XdrError::UnknownDiscriminant {
                    type_name: "LedgerHeaderExt",
                    value,
                })
            }
        };
        Ok(LedgerHeader {
            ledger_version,
            previous_ledger_hash,
            scp_value,
            tx_set_result_hash,
            bucket_list_hash,
            ledger_seq,
            total_coins,
            fee_pool,
            inflation_seq,
            id_pool,
            base_fee,
            base_reserve,
            max_tx_set_size,
            skip_list,
            flags,
        })
    }
}

impl Encode for LedgerHeader {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_u32(self.ledger_version);
        self.previous_ledger_hash.encode(w);
        self.scp_value.encode(w);
        self.tx_set_result_hash.encode(w);
        self.bucket_list_hash.encode(w);
        w.write_u32(self.ledger_seq);
        w.write_i64(self.total_coins);
        w.write_i64(self.fee_pool);
        w.write_u32(self.inflation_seq);
        w.write_u64(self.id_pool);
        w.write_u32(self.base_fee);
        w.write_u32(self.base_reserve);
        w.write_u32(self.max_tx_set_size);
        for hash in &self.skip_list {
            hash.encode(w);
        }
        match self.flags {
            None => w.write_i32(0),
            Some(flags) => {
                w.write_i32(1);
                w.write_u32(flags);
                w.write_i32(0);
            }
        }
    }
}

/// One record of a `ledger-*.xdr.gz` checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerHeaderHistoryEntry {
    pub hash: Hash,
    pub header: LedgerHeader,
}

impl Decode for LedgerHeaderHistoryEntry {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let hash = Hash::decode(r)?;
        let header = LedgerHeader::decode(r)?;
        r.read_empty_ext("LedgerHeaderHistoryEntryExt")?;
        Ok(LedgerHeaderHistoryEntry { hash, header })
    }
}

impl Encode for LedgerHeaderHistoryEntry {
    fn encode(&self, w: &mut XdrWriter) {
        self.hash.encode(w);
        self.header.encode(w);
        w.write_i32(0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSet {
    pub previous_ledger_hash: Hash,
    pub txs: Vec<TransactionEnvelope>,
}

/// One record of a `transactions-*.xdr.gz` checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionHistoryEntry {
    pub ledger_seq: u32,
    pub tx_set: TransactionSet,
}

impl Decode for TransactionHistoryEntry {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let ledger_seq = r.read_u32()?;
        let previous_ledger_hash = Hash::decode(r)?;
        let txs = r.read_array(usize::MAX, TransactionEnvelope::decode)?;
        // v1 carries a generalized transaction set, which is not supported.
        r.read_empty_ext("TransactionHistoryEntryExt")?;
        Ok(TransactionHistoryEntry {
            ledger_seq,
            tx_set: TransactionSet {
                previous_ledger_hash,
                txs,
            },
        })
    }
}

impl Encode for TransactionHistoryEntry {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_u32(self.ledger_seq);
        self.tx_set.previous_ledger_hash.encode(w);
        w.write_array(&self.tx_set.txs, |w, tx| tx.encode(w));
        w.write_i32(0);
    }
}
