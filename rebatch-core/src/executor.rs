use crate::change::{split_dir, Change, OperationError};
use crate::sort::Step;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Result of applying a batch. The two lists are disjoint.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    /// Applied changes, in the order they ran
    pub succeeded: Vec<Change>,
    pub failed: Vec<OperationError>,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Apply `changes` following `plan`.
///
/// A failing rename is recorded and the remaining steps still run.
pub fn execute(changes: &[Change], plan: &[Step]) -> ExecutionOutcome {
    let mut outcome = ExecutionOutcome::default();

    for step in plan {
        match step {
            Step::Rename(idx) => {
                let change = &changes[*idx];
                record(&mut outcome, change, perform_rename(change));
            },
            Step::Cycle(members) => run_cycle(changes, members, &mut outcome),
        }
    }

    tracing::debug!(
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "batch applied"
    );
    outcome
}

fn record(outcome: &mut ExecutionOutcome, change: &Change, result: io::Result<()>) {
    match result {
        Ok(()) => {
            tracing::debug!(
                from = %change.source_path().display(),
                to = %change.target_path().display(),
                "renamed"
            );
            outcome.succeeded.push(change.clone());
        },
        Err(error) => {
            tracing::warn!(change = %change, %error, "rename failed");
            outcome.failed.push(OperationError::new(change.clone(), error));
        },
    }
}

fn perform_rename(change: &Change) -> io::Result<()> {
    let to = prepare_target(change)?;
    fs::rename(change.source_path(), to)
}

/// Create missing parent directories when the target adds path segments
fn prepare_target(change: &Change) -> io::Result<PathBuf> {
    let (dir, _) = split_dir(&change.target);
    if !dir.is_empty() {
        fs::create_dir_all(change.base_dir.join(dir))?;
    }
    Ok(change.target_path())
}

/// Each member's target is the next member's source, so the first source is
/// parked under a temporary name, the rest run back to front, and the parked
/// entry moves into place last. Every move refuses an occupied destination.
///
/// A loop either closes completely or is rolled back: when one member cannot
/// move, the members already moved go back newest first and the head leaves
/// the staging name.
fn run_cycle(changes: &[Change], members: &[usize], outcome: &mut ExecutionOutcome) {
    let Some((&first, rest)) = members.split_first() else {
        return;
    };
    let head = &changes[first];
    let parked = staging_path(&head.source_path());

    tracing::debug!(
        members = members.len(),
        staging = %parked.display(),
        "staging rename cycle"
    );

    if let Err(error) = move_if_free(&head.source_path(), &parked) {
        tracing::warn!(change = %head, %error, "could not stage rename cycle");
        outcome.failed.push(OperationError::new(head.clone(), error));
        for &idx in rest {
            outcome
                .failed
                .push(OperationError::new(changes[idx].clone(), cycle_aborted()));
        }
        return;
    }

    let mut moved = Vec::with_capacity(rest.len());
    for &idx in rest.iter().rev() {
        let change = &changes[idx];
        if let Err(error) = move_into_target(&change.source_path(), change) {
            let failure = CycleFailure {
                member: idx,
                error,
                moved: &moved,
                parked: &parked,
            };
            abort_cycle(changes, members, failure, outcome);
            return;
        }
        moved.push(idx);
    }

    if let Err(error) = move_into_target(&parked, head) {
        let failure = CycleFailure {
            member: first,
            error,
            moved: &moved,
            parked: &parked,
        };
        abort_cycle(changes, members, failure, outcome);
        return;
    }

    for idx in moved {
        record(outcome, &changes[idx], Ok(()));
    }
    record(outcome, head, Ok(()));
}

struct CycleFailure<'a> {
    /// The member whose move failed
    member: usize,
    error: io::Error,
    /// Members already at their targets, in the order they moved
    moved: &'a [usize],
    parked: &'a Path,
}

fn abort_cycle(
    changes: &[Change],
    members: &[usize],
    failure: CycleFailure<'_>,
    outcome: &mut ExecutionOutcome,
) {
    let CycleFailure {
        member,
        error,
        moved,
        parked,
    } = failure;
    let head_idx = members[0];
    let head = &changes[head_idx];

    tracing::warn!(change = %changes[member], %error, "rename cycle aborted");
    let mut head_error = None;
    if member == head_idx {
        head_error = Some(error);
    } else {
        outcome
            .failed
            .push(OperationError::new(changes[member].clone(), error));
    }

    // Newest first: each source was freed by the move that came after it
    let mut stuck = None;
    for (pos, &idx) in moved.iter().enumerate().rev() {
        let change = &changes[idx];
        if let Err(error) = move_if_free(&change.target_path(), &change.source_path()) {
            tracing::warn!(change = %change, %error, "could not roll back cycle member");
            stuck = Some(pos);
            break;
        }
        outcome.failed.push(OperationError::new(
            change.clone(),
            io::Error::other("rolled back, the rename cycle could not be completed"),
        ));
    }

    // Whatever could not be rolled back really was renamed
    if let Some(pos) = stuck {
        for &idx in &moved[..=pos] {
            record(outcome, &changes[idx], Ok(()));
        }
    }

    let restored = match stuck {
        None => move_if_free(parked, &head.source_path()),
        Some(_) => Err(io::Error::other("its source path is still in use")),
    };
    let head_error = match restored {
        Ok(()) => head_error.unwrap_or_else(cycle_aborted),
        Err(error) => {
            tracing::warn!(
                change = %head,
                staging = %parked.display(),
                %error,
                "entry left under staging name"
            );
            io::Error::other(format!(
                "left at {} because it could not be moved back: {}",
                parked.display(),
                error
            ))
        },
    };
    outcome
        .failed
        .push(OperationError::new(head.clone(), head_error));

    // Members after the failing one never ran
    for &idx in &members[1..] {
        if idx != member && !moved.contains(&idx) {
            outcome
                .failed
                .push(OperationError::new(changes[idx].clone(), cycle_aborted()));
        }
    }
}

fn cycle_aborted() -> io::Error {
    io::Error::other("not renamed, the rename cycle could not be completed")
}

fn move_into_target(from: &Path, change: &Change) -> io::Result<()> {
    let to = prepare_target(change)?;
    move_if_free(from, &to)
}

/// Rename unless something already exists at `to`
fn move_if_free(from: &Path, to: &Path) -> io::Result<()> {
    match fs::symlink_metadata(to) {
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        )),
        Err(error) if error.kind() == io::ErrorKind::NotFound => fs::rename(from, to),
        Err(error) => Err(error),
    }
}

fn staging_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{}.{}.rebatch.tmp", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::execution_plan;
    use tempfile::TempDir;

    fn change(base: &Path, source: &str, target: &str) -> Change {
        Change::new(base, source, false).with_target(target)
    }

    #[test]
    fn test_execute_simple_renames() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();

        let changes = vec![change(root, "a.txt", "a.md"), change(root, "b.txt", "b.md")];
        let outcome = execute(&changes, &execution_plan(&changes, false));

        assert!(outcome.is_success());
        assert_eq!(outcome.succeeded.len(), 2);
        assert!(root.join("a.md").exists());
        assert!(root.join("b.md").exists());
        assert!(!root.join("a.txt").exists());
    }

    #[test]
    fn test_execute_creates_intermediate_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("2023-trip.jpg"), "x").unwrap();

        let changes = vec![change(root, "2023-trip.jpg", "2023/trip.jpg")];
        let outcome = execute(&changes, &execution_plan(&changes, false));

        assert!(outcome.is_success());
        assert!(root.join("2023").join("trip.jpg").exists());
    }

    #[test]
    fn test_failures_do_not_stop_batch() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a"), "a").unwrap();
        fs::write(root.join("c"), "c").unwrap();

        let changes = vec![
            change(root, "a", "a2"),
            change(root, "missing", "m2"),
            change(root, "c", "c2"),
        ];
        let outcome = execute(&changes, &execution_plan(&changes, false));

        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].change.source, "missing");
        assert!(root.join("a2").exists());
        assert!(root.join("c2").exists());
    }

    #[test]
    fn test_chain_runs_without_clobbering() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("1"), "one").unwrap();
        fs::write(root.join("2"), "two").unwrap();

        let changes = vec![change(root, "1", "2"), change(root, "2", "3")];
        let outcome = execute(&changes, &execution_plan(&changes, false));

        assert!(outcome.is_success());
        assert_eq!(fs::read_to_string(root.join("2")).unwrap(), "one");
        assert_eq!(fs::read_to_string(root.join("3")).unwrap(), "two");
        assert_eq!(outcome.succeeded[0].source, "2");
    }

    #[test]
    fn test_swap_goes_through_staging() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a"), "A").unwrap();
        fs::write(root.join("b"), "B").unwrap();

        let changes = vec![change(root, "a", "b"), change(root, "b", "a")];
        let outcome = execute(&changes, &execution_plan(&changes, false));

        assert!(outcome.is_success());
        assert_eq!(fs::read_to_string(root.join("a")).unwrap(), "B");
        assert_eq!(fs::read_to_string(root.join("b")).unwrap(), "A");
        assert_eq!(fs::read_dir(root).unwrap().count(), 2);
    }

    #[test]
    fn test_move_if_free_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a"), "A").unwrap();
        fs::write(root.join("b"), "B").unwrap();

        let err = move_if_free(&root.join("a"), &root.join("b")).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(root.join("a")).unwrap(), "A");
        assert_eq!(fs::read_to_string(root.join("b")).unwrap(), "B");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_cycle_member_rolls_back_without_data_loss() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a"), "A").unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("b").join("c"), "C").unwrap();

        // "b" cannot move into its own child, so the loop cannot close
        let changes = vec![
            change(root, "a", "b"),
            Change::new(root, "b", true).with_target("b/c"),
            change(root, "b/c", "a"),
        ];
        let plan = execution_plan(&changes, false);
        assert_eq!(plan, vec![Step::Cycle(vec![0, 1, 2])]);

        let outcome = execute(&changes, &plan);

        assert!(outcome.succeeded.is_empty());
        assert_eq!(outcome.failed.len(), 3);
        assert_eq!(fs::read_to_string(root.join("a")).unwrap(), "A");
        assert_eq!(fs::read_to_string(root.join("b").join("c")).unwrap(), "C");
        assert_eq!(fs::read_dir(root).unwrap().count(), 2);
    }

    #[test]
    fn test_cycle_with_missing_member_restores_the_rest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a"), "A").unwrap();
        fs::write(root.join("c"), "C").unwrap();

        let changes = vec![
            change(root, "a", "b"),
            change(root, "b", "c"),
            change(root, "c", "a"),
        ];
        let outcome = execute(&changes, &execution_plan(&changes, false));

        assert!(outcome.succeeded.is_empty());
        let mut failed: Vec<_> = outcome
            .failed
            .iter()
            .map(|e| e.change.source.as_str())
            .collect();
        failed.sort_unstable();
        assert_eq!(failed, vec!["a", "b", "c"]);
        assert_eq!(fs::read_to_string(root.join("a")).unwrap(), "A");
        assert_eq!(fs::read_to_string(root.join("c")).unwrap(), "C");
        assert!(!root.join("b").exists());
    }
}
