#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod batch;
pub mod change;
pub mod config;
pub mod conflict;
pub mod error;
pub mod executor;
pub mod journal;
pub mod matcher;
pub mod numbering;
pub mod operations;
pub mod output;
pub mod report;
pub mod sort;
pub mod transform;
pub mod traversal;
pub mod variables;

pub use batch::{BatchConfig, BatchOptions, DirMode, Finder, SortKey, SortSpec, TransformMode};
pub use change::{Change, OperationError};
pub use config::Config;
pub use conflict::{auto_fix, validate, Conflict, ConflictKind, ConflictReport};
pub use error::{RebatchError, Result};
pub use executor::{execute, ExecutionOutcome};
pub use journal::{read_journal, recovery_file_name, write_journal, JournalFile};
pub use matcher::{filter_excluded, find_matches};
pub use operations::{rename_operation, undo_operation};
pub use output::{OutputFormat, OutputFormatter, RunMode, RunResult};
pub use report::{
    should_use_color, AnsiFormatter, Formatter, PlainFormatter, Reporter, TableReporter,
};
pub use sort::{execution_plan, safety_order, sort_by_attribute, Step};
pub use transform::apply_transform;
pub use traversal::{candidates, list_entries, Entry, WalkOptions};
pub use variables::{BuiltinVariables, NoVariables, VariableExpander};
