use super::rename::apply_changes;
use crate::batch::BatchConfig;
use crate::error::{RebatchError, Result};
use crate::journal::read_journal;
use crate::output::RunResult;
use crate::report::Reporter;
use crate::sort::sort_by_attribute;

/// Undo operation - revert the renames recorded in `config.undo_file`
pub fn undo_operation(config: &BatchConfig, reporter: &mut dyn Reporter) -> Result<RunResult> {
    let path = config
        .undo_file
        .as_deref()
        .ok_or(RebatchError::MissingArgument)?;

    let journal = read_journal(path)?;
    tracing::info!(
        path = %path.display(),
        entries = journal.operations.len(),
        recorded = %journal.date,
        "loaded journal"
    );

    let mut changes = journal.reversed();

    // Reverted entries still exist under their new names, so they can be
    // sorted for display; applying always uses undo ordering
    if !config.exec {
        if let Some(spec) = config.sort {
            sort_by_attribute(&mut changes, spec)?;
        }
    }

    apply_changes(changes, config, reporter, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchOptions;
    use crate::change::{Change, OperationError};
    use crate::conflict::ConflictReport;
    use crate::journal::write_journal;
    use crate::output::RunMode;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Silent;

    impl Reporter for Silent {
        fn preview(&mut self, _changes: &[Change]) -> io::Result<()> {
            Ok(())
        }

        fn results(&mut self, _succeeded: &[Change], _failed: &[OperationError]) -> io::Result<()> {
            Ok(())
        }

        fn conflicts(&mut self, _report: &ConflictReport) -> io::Result<()> {
            Ok(())
        }

        fn no_matches(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn undo_config(journal: &Path, exec: bool) -> BatchConfig {
        BatchConfig::new(BatchOptions {
            undo_file: Some(journal.to_path_buf()),
            exec,
            ..BatchOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_undo_restores_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("new.txt"), "content").unwrap();
        let journal = root.join("map.json");
        write_journal(
            &journal,
            &[Change::new(root, "old.txt", false).with_target("new.txt")],
        )
        .unwrap();

        let preview = undo_operation(&undo_config(&journal, false), &mut Silent).unwrap();
        assert_eq!(preview.mode, RunMode::UndoPreview);
        assert_eq!(preview.changes[0].source, "new.txt");
        assert!(root.join("new.txt").exists());

        let result = undo_operation(&undo_config(&journal, true), &mut Silent).unwrap();
        assert_eq!(result.mode, RunMode::Undo);
        assert_eq!(fs::read_to_string(root.join("old.txt")).unwrap(), "content");
        assert!(!root.join("new.txt").exists());
    }

    #[test]
    fn test_undo_restores_parent_before_child() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("top2").join("mid2")).unwrap();

        // Recorded in forward order: child dir first, then its parent
        let journal = root.join("map.json");
        write_journal(
            &journal,
            &[
                Change::new(root.join("top"), "mid", true).with_target("mid2"),
                Change::new(root, "top", true).with_target("top2"),
            ],
        )
        .unwrap();

        undo_operation(&undo_config(&journal, true), &mut Silent).unwrap();
        assert!(root.join("top").join("mid").is_dir());
    }

    #[test]
    fn test_missing_journal_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing: PathBuf = temp_dir.path().join("nope.json");
        let err = undo_operation(&undo_config(&missing, true), &mut Silent).unwrap_err();
        assert!(matches!(err, RebatchError::JournalRead { .. }));
    }
}
