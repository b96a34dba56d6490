pub mod app;
pub mod cli;

pub use app::*;
pub use cli::{Cli, Commands, FileKind, InitDbArgs};
