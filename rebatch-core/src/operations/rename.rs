use crate::batch::BatchConfig;
use crate::change::Change;
use crate::conflict::{auto_fix, remove_unchanged, validate};
use crate::error::{RebatchError, Result};
use crate::executor::{execute, ExecutionOutcome};
use crate::journal::{recovery_file_path, write_journal};
use crate::matcher::{filter_excluded, find_matches};
use crate::output::{RunMode, RunResult};
use crate::report::Reporter;
use crate::sort::{execution_plan, safety_order, sort_by_attribute};
use crate::transform::apply_transform;
use crate::variables::VariableExpander;
use std::io;

/// Rename operation - match, transform, validate, then preview or apply
pub fn rename_operation(
    candidates: &[Change],
    config: &BatchConfig,
    expander: &dyn VariableExpander,
    reporter: &mut dyn Reporter,
) -> Result<RunResult> {
    let matches = find_matches(candidates, config)?;
    let mut matches = filter_excluded(matches, config);

    if let Some(spec) = config.sort {
        sort_by_attribute(&mut matches, spec)?;
    }

    apply_transform(&mut matches, config, expander)?;
    remove_unchanged(&mut matches);

    tracing::info!(matched = matches.len(), "targets computed");
    apply_changes(matches, config, reporter, false)
}

/// Validate `changes` and preview or apply them.
///
/// Shared by rename and undo; `undo` selects undo ordering and never
/// auto-fixes, since a reverted name must land exactly where it was.
pub(crate) fn apply_changes(
    mut changes: Vec<Change>,
    config: &BatchConfig,
    reporter: &mut dyn Reporter,
    undo: bool,
) -> Result<RunResult> {
    let mode = match (undo, config.exec) {
        (false, false) => RunMode::Preview,
        (false, true) => RunMode::Apply,
        (true, false) => RunMode::UndoPreview,
        (true, true) => RunMode::Undo,
    };

    if changes.is_empty() {
        if !config.quiet {
            shown(reporter.no_matches());
        }
        return Ok(RunResult {
            mode,
            changes,
            fixed_conflicts: 0,
            journal: None,
        });
    }

    let mut fixed_conflicts = 0;
    let report = validate(&changes);
    if !report.is_empty() {
        if config.fix_conflicts && !undo {
            fixed_conflicts = auto_fix(&mut changes);
            tracing::info!(fixed = fixed_conflicts, "conflicts fixed automatically");
        } else {
            tracing::warn!(conflicts = report.len(), "conflicts block the batch");
            if !config.quiet {
                shown(reporter.conflicts(&report));
            }
            return Err(RebatchError::Conflicts(report));
        }
    }

    if !config.exec {
        if !config.quiet {
            shown(reporter.preview(&changes));
        }
        return Ok(RunResult {
            mode,
            changes,
            fixed_conflicts,
            journal: None,
        });
    }

    if undo || config.dir_mode.includes_dirs() {
        safety_order(&mut changes, undo);
    }
    let plan = execution_plan(&changes, undo);
    let outcome = execute(&changes, &plan);

    if !outcome.is_success() {
        return Err(handle_failures(outcome, config, reporter));
    }

    let journal = match &config.output_file {
        Some(path) => {
            write_journal(path, &outcome.succeeded)?;
            Some(path.clone())
        },
        None => None,
    };

    tracing::info!(renamed = outcome.succeeded.len(), "batch complete");
    Ok(RunResult {
        mode,
        changes: outcome.succeeded,
        fixed_conflicts,
        journal,
    })
}

/// Report the failed batch and journal whatever did succeed
fn handle_failures(
    outcome: ExecutionOutcome,
    config: &BatchConfig,
    reporter: &mut dyn Reporter,
) -> RebatchError {
    let failed = outcome.failed.len();
    tracing::warn!(
        failed,
        succeeded = outcome.succeeded.len(),
        "some renames failed"
    );

    if !config.quiet {
        shown(reporter.results(&outcome.succeeded, &outcome.failed));
    }

    if outcome.succeeded.is_empty() {
        return RebatchError::AllFailed { failed };
    }

    let recovery_file = recovery_file_path(&config.recovery_dir);
    match write_journal(&recovery_file, &outcome.succeeded) {
        Ok(()) => RebatchError::PartialFailure {
            recovery_file,
            failed,
        },
        Err(e) => e,
    }
}

/// Output problems are logged, they never change the outcome of a batch
fn shown(result: io::Result<()>) {
    if let Err(error) = result {
        tracing::warn!(%error, "failed to write report");
    }
}
