use crate::reader::{Decode, XdrReader};
use crate::strkey;
use crate::writer::{Encode, XdrWriter};
use crate::XdrError;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

const PUBLIC_KEY_TYPE_ED25519: i32 = 0;
const KEY_TYPE_ED25519: i32 = 0;
const KEY_TYPE_MUXED_ED25519: i32 = 0x100;

pub(crate) fn serialize_hex<S: Serializer>(bytes: &impl AsRef<[u8]>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serialize_hex(&self.0, s)
    }
}

impl Decode for Hash {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(Hash(r.read_fixed()?))
    }
}

impl Encode for Hash {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_fixed(&self.0);
    }
}

/// An ed25519 account public key (`AccountID` / `PublicKey` in the XDR schema).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn from_strkey(s: &str) -> Result<Self, XdrError> {
        Ok(AccountId(strkey::decode_account_id(s)?))
    }

    pub fn to_strkey(&self) -> String {
        strkey::encode_account_id(&self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strkey())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_strkey())
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_strkey())
    }
}

impl Decode for AccountId {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            PUBLIC_KEY_TYPE_ED25519 => Ok(AccountId(r.read_fixed()?)),
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "PublicKeyType",
                value,
            }),
        }
    }
}

impl Encode for AccountId {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_i32(PUBLIC_KEY_TYPE_ED25519);
        w.write_fixed(&self.0);
    }
}

/// Account reference that may carry a multiplexing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxedAccount {
    Ed25519(AccountId),
    MuxedEd25519 { id: u64, account: AccountId },
}

impl MuxedAccount {
    pub fn account_id(&self) -> AccountId {
        match self {
            MuxedAccount::Ed25519(account) => *account,
            MuxedAccount::MuxedEd25519 { account, .. } => *account,
        }
    }
}

impl From<AccountId> for MuxedAccount {
    fn from(account: AccountId) -> Self {
        MuxedAccount::Ed25519(account)
    }
}

impl Serialize for MuxedAccount {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            MuxedAccount::Ed25519(account) => account.serialize(s),
            MuxedAccount::MuxedEd25519 { id, account } => {
                let mut st = s.serialize_struct("MuxedAccount", 2)?;
                st.serialize_field("account", account)?;
                st.serialize_field("id", id)?;
                st.end()
            }
        }
    }
}

impl Decode for MuxedAccount {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            KEY_TYPE_ED25519 => Ok(MuxedAccount::Ed25519(AccountId(r.read_fixed()?))),
            KEY_TYPE_MUXED_ED25519 => {
                let id = r.read_u64()?;
                let account = AccountId(r.read_fixed()?);
                Ok(MuxedAccount::MuxedEd25519 { id, account })
            }
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "CryptoKeyType",
                value,
            }),
        }
    }
}

impl Encode for MuxedAccount {
    fn encode(&self, w: &mut XdrWriter) {
        match self {
            MuxedAccount::Ed25519(account) => {
                w.write_i32(KEY_TYPE_ED25519);
                w.write_fixed(&account.0);
            }
            MuxedAccount::MuxedEd25519 { id, account } => {
                w.write_i32(KEY_TYPE_MUXED_ED25519);
                w.write_u64(*id);
                w.write_fixed(&account.0);
            }
        }
    }
}

const ASSET_TYPE_NATIVE: i32 = 0;
const ASSET_TYPE_CREDIT_ALPHANUM4: i32 = 1;
const ASSET_TYPE_CREDIT_ALPHANUM12: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Native,
    CreditAlphanum4 { code: [u8; 4], issuer: AccountId },
    CreditAlphanum12 { code: [u8; 12], issuer: AccountId },
}

impl Asset {
    /// Builds a credit asset, picking the 4 or 12 character variant from the code length.
    pub fn credit(code: &str, issuer: AccountId) -> Result<Self, XdrError> {
        let bytes = code.as_bytes();
        let invalid = || XdrError::InvalidAssetCode {
            code: code.to_string(),
        };
        if bytes.is_empty() || !bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        match bytes.len() {
            1..=4 => {
                let mut padded = [0u8; 4];
                padded[..bytes.len()].copy_from_slice(bytes);
                Ok(Asset::CreditAlphanum4 { code: padded, issuer })
            }
            5..=12 => {
                let mut padded = [0u8; 12];
                padded[..bytes.len()].copy_from_slice(bytes);
                Ok(Asset::CreditAlphanum12 { code: padded, issuer })
            }
            _ => Err(invalid()),
        }
    }

    pub fn code(&self) -> Option<String> {
        let raw: &[u8] = match self {
            Asset::Native => return None,
            Asset::CreditAlphanum4 { code, .. } => code,
            Asset::CreditAlphanum12 { code, .. } => code,
        };
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        Some(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub fn issuer(&self) -> Option<&AccountId> {
        match self {
            Asset::Native => None,
            Asset::CreditAlphanum4 { issuer, .. } | Asset::CreditAlphanum12 { issuer, .. } => Some(issuer),
        }
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match (self.code(), self.issuer()) {
            (Some(code), Some(issuer)) => {
                let mut st = s.serialize_struct("Asset", 2)?;
                st.serialize_field("code", &code)?;
                st.serialize_field("issuer", issuer)?;
                st.end()
            }
            _ => s.serialize_str("native"),
        }
    }
}

impl Decode for Asset {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            ASSET_TYPE_NATIVE => Ok(Asset::Native),
            ASSET_TYPE_CREDIT_ALPHANUM4 => Ok(Asset::CreditAlphanum4 {
                code: r.read_fixed()?,
                issuer: AccountId::decode(r)?,
            }),
            ASSET_TYPE_CREDIT_ALPHANUM12 => Ok(Asset::CreditAlphanum12 {
                code: r.read_fixed()?,
                issuer: AccountId::decode(r)?,
            }),
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "AssetType",
                value,
            }),
        }
    }
}

impl Encode for Asset {
    fn encode(&self, w: &mut XdrWriter) {
        match self {
            Asset::Native => w.write_i32(ASSET_TYPE_NATIVE),
            Asset::CreditAlphanum4 { code, issuer } => {
                w.write_i32(ASSET_TYPE_CREDIT_ALPHANUM4);
                w.write_fixed(code);
                issuer.encode(w);
            }
            Asset::CreditAlphanum12 { code, issuer } => {
                w.write_i32(ASSET_TYPE_CREDIT_ALPHANUM12);
                w.write_fixed(code);
                issuer.encode(w);
            }
        }
    }
}

const MEMO_NONE: i32 = 0;
const MEMO_TEXT: i32 = 1;
const MEMO_ID: i32 = 2;
const MEMO_HASH: i32 = 3;
const MEMO_RETURN: i32 = 4;

/// Transaction memo. Text is kept as raw bytes since the network does not enforce UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Memo {
    None,
    Text(Vec<u8>),
    Id(u64),
    Hash(Hash),
    Return(Hash),
}

impl Memo {
    pub fn text(&self) -> Option<String> {
        match self {
            Memo::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

impl Serialize for Memo {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("Memo", 2)?;
        match self {
            Memo::None => {
                st.serialize_field("type", "none")?;
            }
            Memo::Text(_) => {
                st.serialize_field("type", "text")?;
                st.serialize_field("value", &self.text())?;
            }
            Memo::Id(id) => {
                st.serialize_field("type", "id")?;
                st.serialize_field("value", id)?;
            }
            Memo::Hash(hash) => {
                st.serialize_field("type", "hash")?;
                st.serialize_field("value", hash)?;
            }
            Memo::Return(hash) => {
                st.serialize_field("type", "return")?;
                st.serialize_field("value", hash)?;
            }
        }
        st.end()
    }
}

impl Decode for Memo {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            MEMO_NONE => Ok(Memo::None),
            MEMO_TEXT => Ok(Memo::Text(r.read_opaque(28)?)),
            MEMO_ID => Ok(Memo::Id(r.read_u64()?)),
            MEMO_HASH => Ok(Memo::Hash(Hash::decode(r)?)),
            MEMO_RETURN => Ok(Memo::Return(Hash::decode(r)?)),
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "MemoType",
                value,
            }),
        }
    }
}

impl Encode for Memo {
    fn encode(&self, w: &mut XdrWriter) {
        match self {
            Memo::None => w.write_i32(MEMO_NONE),
            Memo::Text(bytes) => {
                w.write_i32(MEMO_TEXT);
                w.write_opaque(bytes);
            }
            Memo::Id(id) => {
                w.write_i32(MEMO_ID);
                w.write_u64(*id);
            }
            Memo::Hash(hash) => {
                w.write_i32(MEMO_HASH);
                hash.encode(w);
            }
            Memo::Return(hash) => {
                w.write_i32(MEMO_RETURN);
                hash.encode(w);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Price {
    pub n: i32,
    pub d: i32,
}

impl Decode for Price {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(Price {
            n: r.read_i32()?,
            d: r.read_i32()?,
        })
    }
}

impl Encode for Price {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_i32(self.n);
        w.write_i32(self.d);
    }
}

const SIGNER_KEY_TYPE_ED25519: i32 = 0;
const SIGNER_KEY_TYPE_PRE_AUTH_TX: i32 = 1;
const SIGNER_KEY_TYPE_HASH_X: i32 = 2;
const SIGNER_KEY_TYPE_ED25519_SIGNED_PAYLOAD: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum SignerKey {
    Ed25519(AccountId),
    PreAuthTx(Hash),
    HashX(Hash),
    Ed25519SignedPayload {
        ed25519: AccountId,
        #[serde(serialize_with = "serialize_hex")]
        payload: Vec<u8>,
    },
}

impl Decode for SignerKey {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match r.read_i32()? {
            SIGNER_KEY_TYPE_ED25519 => Ok(SignerKey::Ed25519(AccountId(r.read_fixed()?))),
            SIGNER_KEY_TYPE_PRE_AUTH_TX => Ok(SignerKey::PreAuthTx(Hash::decode(r)?)),
            SIGNER_KEY_TYPE_HASH_X => Ok(SignerKey::HashX(Hash::decode(r)?)),
            SIGNER_KEY_TYPE_ED25519_SIGNED_PAYLOAD => Ok(SignerKey::Ed25519SignedPayload {
                ed25519: AccountId(r.read_fixed()?),
                payload: r.read_opaque(64)?,
            }),
            value => Err(XdrError::UnknownDiscriminant {
                type_name: "SignerKeyType",
                value,
            }),
        }
    }
}

impl Encode for SignerKey {
    fn encode(&self, w: &mut XdrWriter) {
        match self {
            SignerKey::Ed25519(key) => {
                w.write_i32(SIGNER_KEY_TYPE_ED25519);
                w.write_fixed(&key.0);
            }
            SignerKey::PreAuthTx(hash) => {
                w.write_i32(SIGNER_KEY_TYPE_PRE_AUTH_TX);
                hash.encode(w);
            }
            SignerKey::HashX(hash) => {
                w.write_i32(SIGNER_KEY_TYPE_HASH_X);
                hash.encode(w);
            }
            SignerKey::Ed25519SignedPayload { ed25519, payload } => {
                w.write_i32(SIGNER_KEY_TYPE_ED25519_SIGNED_PAYLOAD);
                w.write_fixed(&ed25519.0);
                w.write_opaque(payload);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signer {
    pub key: SignerKey,
    pub weight: u32,
}

impl Decode for Signer {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(Signer {
            key: SignerKey::decode(r)?,
            weight: r.read_u32()?,
        })
    }
}

impl Encode for Signer {
    fn encode(&self, w: &mut XdrWriter) {
        self.key.encode(w);
        w.write_u32(self.weight);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratedSignature {
    #[serde(serialize_with = "serialize_hex")]
    pub hint: [u8; 4],
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

impl Decode for DecoratedSignature {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(DecoratedSignature {
            hint: r.read_fixed()?,
            signature: r.read_opaque(64)?,
        })
    }
}

impl Encode for DecoratedSignature {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_fixed(&self.hint);
        w.write_opaque(&self.signature);
    }
}
