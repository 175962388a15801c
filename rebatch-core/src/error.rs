use crate::conflict::ConflictReport;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Terminal error of a rebatch run.
///
/// Configuration and token errors are raised before anything on disk is
/// touched. Per-entry rename failures never surface individually; they are
/// folded into [`RebatchError::PartialFailure`] or [`RebatchError::AllFailed`]
/// once the whole batch has been attempted.
#[derive(Debug, Error)]
pub enum RebatchError {
    #[error("Invalid argument: one of find, replace or undo must be present and set to a non empty value")]
    MissingArgument,

    #[error("Invalid find pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid sort key '{0}' (expected one of: size, mtime, atime, btime, ctime)")]
    InvalidSortKey(String),

    #[error("Invalid numbering token '{token}': {reason}")]
    InvalidNumbering { token: String, reason: String },

    #[error("Invalid variable '{token}': {reason}")]
    Variable { token: String, reason: String },

    #[error("Failed to read metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Conflict detected! Please resolve before proceeding or append the -F flag to fix conflicts automatically")]
    Conflicts(ConflictReport),

    #[error("Some files could not be renamed. The successful operations have been written to {}. To revert the changes, pass this file to the --undo flag", recovery_file.display())]
    PartialFailure {
        recovery_file: PathBuf,
        failed: usize,
    },

    #[error("The renaming operation failed due to the above errors ({failed} failed)")]
    AllFailed { failed: usize },

    #[error("Could not save the journal to {}: {source}. The renames that succeeded cannot be undone automatically", path.display())]
    JournalUnsaved {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read journal {}: {source}", path.display())]
    JournalRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse journal {}: {source}", path.display())]
    JournalParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RebatchError {
    /// True for errors caused by bad input rather than by the filesystem.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument
                | Self::InvalidPattern { .. }
                | Self::InvalidExclude { .. }
                | Self::InvalidSortKey(_)
                | Self::InvalidNumbering { .. }
                | Self::Variable { .. }
        )
    }
}

pub type Result<T, E = RebatchError> = std::result::Result<T, E>;
