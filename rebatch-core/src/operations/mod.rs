//! High-level operations that correspond to CLI modes
//!
//! These modules run the whole pipeline for one batch, separated from CLI
//! concerns like argument parsing and output formatting.

pub mod rename;
pub mod undo;

pub use rename::rename_operation;
pub use undo::undo_operation;
