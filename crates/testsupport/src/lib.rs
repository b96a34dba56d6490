//! Builders for checkpoint files and configs used across the workspace tests.

pub mod archive;
pub mod fixtures;

pub use archive::*;
pub use fixtures::*;
