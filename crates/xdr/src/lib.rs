//! XDR codec for the subset of the Stellar protocol found in history archive
//! checkpoint files (`ledger-*.xdr.gz`, `transactions-*.xdr.gz`).

pub mod error;
pub mod hash;
pub mod reader;
pub mod stream;
pub mod strkey;
pub mod types;
pub mod writer;

pub use error::*;
pub use hash::*;
pub use reader::{from_bytes, Decode, XdrReader};
pub use types::*;
pub use writer::{to_bytes, Encode, XdrWriter};

/// Decodes a gzipped ledger header checkpoint file.
pub fn parse_ledger_file(gz: &[u8]) -> Result<Vec<LedgerHeaderHistoryEntry>, XdrError> {
    stream::read_file(gz)
}

/// Decodes a gzipped transactions checkpoint file.
pub fn parse_transactions_file(gz: &[u8]) -> Result<Vec<TransactionHistoryEntry>, XdrError> {
    stream::read_file(gz)
}
