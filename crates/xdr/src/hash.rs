use crate::types::Hash;
use sha2::{Digest, Sha256};

pub const PUBLIC_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Identifies the network a transaction was signed for: `sha256(passphrase)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkId(pub Hash);

impl NetworkId {
    pub fn from_passphrase(passphrase: &str) -> Self {
        NetworkId(sha256(passphrase.as_bytes()))
    }
}
