pub mod common;
pub mod ledger;
pub mod operation;
pub mod transaction;

pub use common::*;
pub use ledger::*;
pub use operation::*;
pub use transaction::*;
