use super::common::{AccountId, Asset, MuxedAccount, Price, Signer};
use crate::reader::{Decode, XdrReader};
use crate::writer::{Encode, XdrWriter};
use crate::XdrError;
use serde::Serialize;

pub const CREATE_ACCOUNT: i32 = 0;
pub const PAYMENT: i32 = 1;
pub const PATH_PAYMENT_STRICT_RECEIVE: i32 = 2;
pub const MANAGE_SELL_OFFER: i32 = 3;
pub const CREATE_PASSIVE_SELL_OFFER: i32 = 4;
pub const SET_OPTIONS: i32 = 5;
pub const CHANGE_TRUST: i32 = 6;
pub const ALLOW_TRUST: i32 = 7;
pub const ACCOUNT_MERGE: i32 = 8;
pub const INFLATION: i32 = 9;
pub const MANAGE_DATA: i32 = 10;
pub const BUMP_SEQUENCE: i32 = 11;
pub const MANAGE_BUY_OFFER: i32 = 12;
pub const PATH_PAYMENT_STRICT_SEND: i32 = 13;

const MAX_PATH_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub source_account: Option<MuxedAccount>,
    pub body: OperationBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum OperationBody {
    CreateAccount(CreateAccountOp),
    Payment(PaymentOp),
    PathPaymentStrictReceive(PathPaymentStrictReceiveOp),
    ManageSellOffer(ManageOfferOp),
    CreatePassiveSellOffer(CreatePassiveSellOfferOp),
    SetOptions(SetOptionsOp),
    ChangeTrust(ChangeTrustOp),
    AllowTrust(AllowTrustOp),
    AccountMerge(MuxedAccount),
    Inflation,
    ManageData(ManageDataOp),
    BumpSequence(BumpSequenceOp),
    ManageBuyOffer(ManageOfferOp),
    PathPaymentStrictSend(PathPaymentStrictSendOp),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAccountOp {
    pub destination: AccountId,
    pub starting_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOp {
    pub destination: MuxedAccount,
    pub asset: Asset,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathPaymentStrictReceiveOp {
    pub send_asset: Asset,
    pub send_max: i64,
    pub destination: MuxedAccount,
    pub dest_asset: Asset,
    pub dest_amount: i64,
    pub path: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathPaymentStrictSendOp {
    pub send_asset: Asset,
    pub send_amount: i64,
    pub destination: MuxedAccount,
    pub dest_asset: Asset,
    pub dest_min: i64,
    pub path: Vec<Asset>,
}

/// Shared by manage sell and manage buy offers; `amount` is the buy amount for the latter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManageOfferOp {
    pub selling: Asset,
    pub buying: Asset,
    pub amount: i64,
    pub price: Price,
    pub offer_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePassiveSellOfferOp {
    pub selling: Asset,
    pub buying: Asset,
    pub amount: i64,
    pub price: Price,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetOptionsOp {
    pub inflation_dest: Option<AccountId>,
    pub clear_flags: Option<u32>,
    pub set_flags: Option<u32>,
    pub master_weight: Option<u32>,
    pub low_threshold: Option<u32>,
    pub med_threshold: Option<u32>,
    pub high_threshold: Option<u32>,
    pub home_domain: Option<String>,
    pub signer: Option<Signer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeTrustOp {
    pub line: Asset,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowTrustOp {
    pub trustor: AccountId,
    /// Asset code without issuer, trailing zero bytes stripped.
    pub asset_code: String,
    #[serde(skip)]
    pub asset_code_raw: AssetCode,
    pub authorize: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetCode {
    AlphaNum4([u8; 4]),
    AlphaNum12([u8; 12]),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManageDataOp {
    pub data_name: String,
    #[serde(serialize_with = "serialize_optional_hex")]
    pub data_value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BumpSequenceOp {
    pub bump_to: i64,
}

fn serialize_optional_hex<S: serde::Serializer>(
    value: &Option<Vec<u8>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(bytes) => s.serialize_some(&hex::encode(bytes)),
        None => s.serialize_none(),
    }
}

impl OperationBody {
    pub fn type_code(&self) -> i32 {
        match self {
            OperationBody::CreateAccount(_) => CREATE_ACCOUNT,
            OperationBody::Payment(_) => PAYMENT,
            OperationBody::PathPaymentStrictReceive(_) => PATH_PAYMENT_STRICT_RECEIVE,
            OperationBody::ManageSellOffer(_) => MANAGE_SELL_OFFER,
            OperationBody::CreatePassiveSellOffer(_) => CREATE_PASSIVE_SELL_OFFER,
            OperationBody::SetOptions(_) => SET_OPTIONS,
            OperationBody::ChangeTrust(_) => CHANGE_TRUST,
            OperationBody::AllowTrust(_) => ALLOW_TRUST,
            OperationBody::AccountMerge(_) => ACCOUNT_MERGE,
            OperationBody::Inflation => INFLATION,
            OperationBody::ManageData(_) => MANAGE_DATA,
            OperationBody::BumpSequence(_) => BUMP_SEQUENCE,
            OperationBody::ManageBuyOffer(_) => MANAGE_BUY_OFFER,
            OperationBody::PathPaymentStrictSend(_) => PATH_PAYMENT_STRICT_SEND,
        }
    }
}

fn read_path(r: &mut XdrReader<'_>) -> Result<Vec<Asset>, XdrError> {
    r.read_array(MAX_PATH_LEN, Asset::decode)
}

fn read_manage_offer(r: &mut XdrReader<'_>) -> Result<ManageOfferOp, XdrError> {
    Ok(ManageOfferOp {
        selling: Asset::decode(r)?,
        buying: Asset::decode(r)?,
        amount: r.read_i64()?,
        price: Price::decode(r)?,
        offer_id: r.read_i64()?,
    })
}

fn read_allow_trust(r: &mut XdrReader<'_>) -> Result<AllowTrustOp, XdrError> {
    let trustor = AccountId::decode(r)?;
    let asset_code_raw = match r.read_i32()? {
        1 => AssetCode::AlphaNum4(r.read_fixed()?),
        2 => AssetCode::AlphaNum12(r.read_fixed()?),
        value => {
            return Err(XdrError::UnknownDiscriminant {
                type_name: "AssetCode",
                value,
            })
        }
    };
    let raw: &[u8] = match &asset_code_raw {
        AssetCode::AlphaNum4(code) => code,
        AssetCode::AlphaNum12(code) => code,
    };
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    let asset_code = String::from_utf8_lossy(&raw[..end]).into_owned();
    Ok(AllowTrustOp {
        trustor,
        asset_code,
        asset_code_raw,
        authorize: r.read_u32()?,
    })
}

impl Decode for OperationBody {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let body = match r.read_i32()? {
            CREATE_ACCOUNT => OperationBody::CreateAccount(CreateAccountOp {
                destination: AccountId::decode(r)?,
                starting_balance: r.read_i64()?,
            }),
            PAYMENT => OperationBody::Payment(PaymentOp {
                destination: MuxedAccount::decode(r)?,
                asset: Asset::decode(r)?,
                amount: r.read_i64()?,
            }),
            PATH_PAYMENT_STRICT_RECEIVE => {
                OperationBody::PathPaymentStrictReceive(PathPaymentStrictReceiveOp {
                    send_asset: Asset::decode(r)?,
                    send_max: r.read_i64()?,
                    destination: MuxedAccount::decode(r)?,
                    dest_asset: Asset::decode(r)?,
                    dest_amount: r.read_i64()?,
                    path: read_path(r)?,
                })
            }
            MANAGE_SELL_OFFER => OperationBody::ManageSellOffer(read_manage_offer(r)?),
            CREATE_PASSIVE_SELL_OFFER => {
                OperationBody::CreatePassiveSellOffer(CreatePassiveSellOfferOp {
                    selling: Asset::decode(r)?,
                    buying: Asset::decode(r)?,
                    amount: r.read_i64()?,
                    price: Price::decode(r)?,
                })
            }
            SET_OPTIONS => OperationBody::SetOptions(SetOptionsOp {
                inflation_dest: r.read_option(AccountId::decode)?,
                clear_flags: r.read_option(|r| r.read_u32())?,
                set_flags: r.read_option(|r| r.read_u32())?,
                master_weight: r.read_option(|r| r.read_u32())?,
                low_threshold: r.read_option(|r| r.read_u32())?,
                med_threshold: r.read_option(|r| r.read_u32())?,
                high_threshold: r.read_option(|r| r.read_u32())?,
                home_domain: r.read_option(|r| r.read_string(32))?,
                signer: r.read_option(Signer::decode)?,
            }),
            CHANGE_TRUST => OperationBody::ChangeTrust(ChangeTrustOp {
                line: Asset::decode(r)?,
                limit: r.read_i64()?,
            }),
            ALLOW_TRUST => OperationBody::AllowTrust(read_allow_trust(r)?),
            ACCOUNT_MERGE => OperationBody::AccountMerge(MuxedAccount::decode(r)?),
            INFLATION => OperationBody::Inflation,
            MANAGE_DATA => OperationBody::ManageData(ManageDataOp {
                data_name: r.read_string(64)?,
                data_value: r.read_option(|r| r.read_opaque(64))?,
            }),
            BUMP_SEQUENCE => OperationBody::BumpSequence(BumpSequenceOp {
                bump_to: r.read_i64()?,
            }),
            MANAGE_BUY_OFFER => OperationBody::ManageBuyOffer(read_manage_offer(r)?),
            PATH_PAYMENT_STRICT_SEND => {
                OperationBody::PathPaymentStrictSend(PathPaymentStrictSendOp {
                    send_asset: Asset::decode(r)?,
                    send_amount: r.read_i64()?,
                    destination: MuxedAccount::decode(r)?,
                    dest_asset: Asset::decode(r)?,
                    dest_min: r.read_i64()?,
                    path: read_path(r)?,
                })
            }
            value => {
                return Err(XdrError::UnknownDiscriminant {
                    type_name: "OperationType",
                    value,
                })
            }
        };
        Ok(body)
    }
}

fn write_manage_offer(w: &mut XdrWriter, op: &ManageOfferOp) {
    op.selling.encode(w);
    op.buying.encode(w);
    w.write_i64(op.amount);
    op.price.encode(w);
    w.write_i64(op.offer_id);
}

impl Encode for OperationBody {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_i32(self.type_code());
        match self {
            OperationBody::CreateAccount(op) => {
                op.destination.encode(w);
                w.write_i64(op.starting_balance);
            }
            OperationBody::Payment(op) => {
                op.destination.encode(w);
                op.asset.encode(w);
                w.write_i64(op.amount);
            }
            OperationBody::PathPaymentStrictReceive(op) => {
                op.send_asset.encode(w);
                w.write_i64(op.send_max);
                op.destination.encode(w);
                op.dest_asset.encode(w);
                w.write_i64(op.dest_amount);
                w.write_array(&op.path, |w, a| a.encode(w));
            }
            OperationBody::ManageSellOffer(op) | OperationBody::ManageBuyOffer(op) => {
                write_manage_offer(w, op)
            }
            OperationBody::CreatePassiveSellOffer(op) => {
                op.selling.encode(w);
                op.buying.encode(w);
                w.write_i64(op.amount);
                op.price.encode(w);
            }
            OperationBody::SetOptions(op) => {
                w.write_option(op.inflation_dest.as_ref(), |w, v| v.encode(w));
                for flag in [
                    op.clear_flags,
                    op.set_flags,
                    op.master_weight,
                    op.low_threshold,
                    op.med_threshold,
                    op.high_threshold,
                ] {
                    w.write_option(flag.as_ref(), |w, v| w.write_u32(*v));
                }
                w.write_option(op.home_domain.as_ref(), |w, v| w.write_string(v));
                w.write_option(op.signer.as_ref(), |w, v| v.encode(w));
            }
            OperationBody::ChangeTrust(op) => {
                op.line.encode(w);
                w.write_i64(op.limit);
            }
            OperationBody::AllowTrust(op) => {
                op.trustor.encode(w);
                match &op.asset_code_raw {
                    AssetCode::AlphaNum4(code) => {
                        w.write_i32(1);
                        w.write_fixed(code);
                    }
                    AssetCode::AlphaNum12(code) => {
                        w.write_i32(2);
                        w.write_fixed(code);
                    }
                }
                w.write_u32(op.authorize);
            }
            OperationBody::AccountMerge(destination) => destination.encode(w),
            OperationBody::Inflation => {}
            OperationBody::ManageData(op) => {
                w.write_string(&op.data_name);
                w.write_option(op.data_value.as_ref(), |w, v| w.write_opaque(v));
            }
            OperationBody::BumpSequence(op) => w.write_i64(op.bump_to),
            OperationBody::PathPaymentStrictSend(op) => {
                op.send_asset.encode(w);
                w.write_i64(op.send_amount);
                op.destination.encode(w);
                op.dest_asset.encode(w);
                w.write_i64(op.dest_min);
                w.write_array(&op.path, |w, a| a.encode(w));
            }
        }
    }
}

impl Decode for Operation {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(Operation {
            source_account: r.read_option(MuxedAccount::decode)?,
            body: OperationBody::decode(r)?,
        })
    }
}

impl Encode for Operation {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_option(self.source_account.as_ref(), |w, v| v.encode(w));
        self.body.encode(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes};

    fn account(n: u8) -> AccountId {
        AccountId([n; 32])
    }

    #[test]
    fn test_payment_with_operation_source() {
        let op = Operation {
            source_account: Some(MuxedAccount::Ed25519(account(1))),
            body: OperationBody::Payment(PaymentOp {
                destination: MuxedAccount::Ed25519(account(2)),
                asset: Asset::credit("KIN", account(9)).unwrap(),
                amount: 1_000,
            }),
        };
        let bytes = to_bytes(&op);
        let decoded: Operation = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(decoded.body.type_code(), PAYMENT);
    }

    #[test]
    fn test_set_options_with_signer() {
        let op = Operation {
            source_account: None,
            body: OperationBody::SetOptions(SetOptionsOp {
                master_weight: Some(1),
                home_domain: Some("example.com".to_string()),
                signer: Some(Signer {
                    key: crate::SignerKey::Ed25519(account(3)),
                    weight: 5,
                }),
                ..Default::default()
            }),
        };
        let decoded: Operation = from_bytes(&to_bytes(&op)).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn test_allow_trust_strips_code_padding() {
        let mut w = XdrWriter::new();
        w.write_i32(ALLOW_TRUST);
        account(4).encode(&mut w);
        w.write_i32(1);
        w.write_fixed(b"AB\0\0");
        w.write_u32(1);
        let body: OperationBody = from_bytes(&w.into_bytes()).unwrap();
        match body {
            OperationBody::AllowTrust(op) => {
                assert_eq!(op.asset_code, "AB");
                assert_eq!(op.authorize, 1);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unsupported_operation_type() {
        let bytes = [0, 0, 0, 0, 0, 0, 0, 14];
        assert_eq!(
            from_bytes::<Operation>(&bytes).unwrap_err(),
            XdrError::UnknownDiscriminant {
                type_name: "OperationType",
                value: 14
            }
        );
    }

    #[test]
    fn test_path_length_is_bounded() {
        let mut w = XdrWriter::new();
        w.write_i32(PATH_PAYMENT_STRICT_SEND);
        Asset::Native.encode(&mut w);
        w.write_i64(1);
        MuxedAccount::Ed25519(account(1)).encode(&mut w);
        Asset::Native.encode(&mut w);
        w.write_i64(1);
        w.write_u32(6);
        let err = from_bytes::<OperationBody>(&w.into_bytes()).unwrap_err();
        assert_eq!(err, XdrError::LengthExceeded { len: 6, max: 5 });
    }
}
