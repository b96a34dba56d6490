pub mod collector;
pub mod extract;

pub use collector::*;
pub use extract::*;
