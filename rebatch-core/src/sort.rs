use crate::batch::{SortKey, SortSpec};
use crate::change::{absolute_key, Change};
use crate::error::{RebatchError, Result};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamp for a time-based sort key.
///
/// Birth and change time fall back to the modification time where the
/// platform does not record them.
pub(crate) fn file_time(metadata: &Metadata, key: SortKey) -> SystemTime {
    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    match key {
        SortKey::Accessed => metadata.accessed().unwrap_or(modified),
        SortKey::Birth => metadata.created().unwrap_or(modified),
        SortKey::Changed => change_time(metadata).unwrap_or(modified),
        SortKey::Modified | SortKey::Size => modified,
    }
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_metadata: &Metadata) -> Option<SystemTime> {
    None
}

fn sort_value(change: &Change, key: SortKey) -> Result<u128> {
    let path = change.source_path();
    let metadata = fs::metadata(&path).map_err(|source| RebatchError::Metadata {
        path: path.clone(),
        source,
    })?;

    let value = match key {
        SortKey::Size => u128::from(metadata.len()),
        time_key => file_time(&metadata, time_key)
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    };
    Ok(value)
}

/// Order candidates by size or by one of their timestamps before numbering.
///
/// Largest / newest first unless `spec.reverse` is set. Ties keep their
/// original relative order.
pub fn sort_by_attribute(changes: &mut Vec<Change>, spec: SortSpec) -> Result<()> {
    let values = changes
        .par_iter()
        .map(|change| sort_value(change, spec.key))
        .collect::<Result<Vec<_>>>()?;

    let mut keyed: Vec<(u128, Change)> = values.into_iter().zip(changes.drain(..)).collect();
    if spec.reverse {
        keyed.sort_by_key(|(value, _)| *value);
    } else {
        keyed.sort_by_key(|(value, _)| Reverse(*value));
    }
    changes.extend(keyed.into_iter().map(|(_, change)| change));

    Ok(())
}

fn depth(dir: &Path) -> usize {
    absolute_key(dir).components().count()
}

/// Order renames so no rename pulls a path out from under another one.
///
/// Forward runs rename files before directories and deeper directories
/// before their parents. Undo runs restore shallower base directories first
/// so parents exist again before children are moved back into them.
pub fn safety_order(changes: &mut [Change], undo: bool) {
    if undo {
        changes.sort_by_cached_key(|change| depth(&change.base_dir));
    } else {
        changes.sort_by_cached_key(|change| {
            let dir_depth = if change.is_dir {
                depth(&change.base_dir)
            } else {
                0
            };
            (change.is_dir, Reverse(dir_depth))
        });
    }
}

/// One unit of work for the executor, indexing into the ordered changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Rename(usize),
    /// Renames whose targets form a loop (`a -> b`, `b -> a`). Listed so that
    /// each member's target is the next member's source; the last member's
    /// target is the first member's source.
    Cycle(Vec<usize>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    Active,
    Done,
}

/// Turn an ordered change list into executor steps.
///
/// Two kinds of constraints decide the order:
/// - a change whose target is the current path of another change runs after
///   it, so the path is free (loops of these become [`Step::Cycle`]);
/// - an entry inside a renamed directory runs before that directory on
///   forward runs, and after it on undo runs, so its base path is valid.
///
/// Changes not constrained against each other keep their given order.
pub fn execution_plan(changes: &[Change], undo: bool) -> Vec<Step> {
    let sources: HashMap<PathBuf, usize> = changes
        .iter()
        .enumerate()
        .map(|(idx, change)| (change.source_key(), idx))
        .collect();

    let depends_on: Vec<Option<usize>> = changes
        .iter()
        .enumerate()
        .map(|(idx, change)| {
            sources
                .get(&change.target_key())
                .copied()
                .filter(|&other| other != idx)
        })
        .collect();

    let units = rename_units(&depends_on);
    let mut unit_of = vec![0; changes.len()];
    for (unit, members) in units.iter().enumerate() {
        for &idx in members {
            unit_of[idx] = unit;
        }
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); units.len()];
    let mut pending = vec![0usize; units.len()];
    let mut order_before = |first: usize, then: usize| {
        let (from, to) = (unit_of[first], unit_of[then]);
        if from != to {
            successors[from].push(to);
            pending[to] += 1;
        }
    };

    for (idx, blocker) in depends_on.iter().enumerate() {
        if let Some(blocker) = *blocker {
            order_before(blocker, idx);
        }
    }

    // Forward runs look directories up by their current path, undo runs by
    // the path they are restored to
    let dirs: HashMap<PathBuf, usize> = changes
        .iter()
        .enumerate()
        .filter(|(_, change)| change.is_dir)
        .map(|(idx, change)| {
            let key = if undo {
                change.target_key()
            } else {
                change.source_key()
            };
            (key, idx)
        })
        .collect();

    for (idx, change) in changes.iter().enumerate() {
        let source = change.source_key();
        for ancestor in source.ancestors().skip(1) {
            let Some(&dir) = dirs.get(ancestor) else {
                continue;
            };
            if dir == idx {
                continue;
            }
            if undo {
                order_before(dir, idx);
            } else {
                order_before(idx, dir);
            }
        }
    }

    // Kahn's algorithm, always taking the ready unit that came first
    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = units
        .iter()
        .enumerate()
        .filter(|(unit, _)| pending[*unit] == 0)
        .map(|(unit, members)| Reverse((first_index(members), unit)))
        .collect();
    let mut placed = vec![false; units.len()];
    let mut steps = Vec::with_capacity(units.len());

    while let Some(Reverse((_, unit))) = ready.pop() {
        placed[unit] = true;
        steps.push(step_for(&units[unit]));
        for &next in &successors[unit] {
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.push(Reverse((first_index(&units[next]), next)));
            }
        }
    }

    if steps.len() < units.len() {
        // Constraints that contradict each other; run the rest as given and
        // let the executor report what cannot be done
        let mut rest: Vec<usize> = (0..units.len()).filter(|&unit| !placed[unit]).collect();
        tracing::warn!(units = rest.len(), "rename order has contradicting constraints");
        rest.sort_by_key(|&unit| first_index(&units[unit]));
        steps.extend(rest.into_iter().map(|unit| step_for(&units[unit])));
    }

    steps
}

/// Group changes into single renames and rename loops. A loop lists its
/// members so that each target is the next member's source.
fn rename_units(depends_on: &[Option<usize>]) -> Vec<Vec<usize>> {
    let mut state = vec![Visit::Pending; depends_on.len()];
    let mut units = Vec::with_capacity(depends_on.len());

    for start in 0..depends_on.len() {
        if state[start] == Visit::Done {
            continue;
        }

        let mut chain = Vec::new();
        let mut cycle_at = None;
        let mut current = start;
        loop {
            match state[current] {
                Visit::Done => break,
                Visit::Active => {
                    cycle_at = chain.iter().position(|&idx| idx == current);
                    break;
                },
                Visit::Pending => {},
            }
            state[current] = Visit::Active;
            chain.push(current);
            match depends_on[current] {
                Some(next) => current = next,
                None => break,
            }
        }

        let singles = match cycle_at {
            Some(pos) => {
                units.push(chain[pos..].to_vec());
                &chain[..pos]
            },
            None => &chain[..],
        };
        units.extend(singles.iter().map(|&idx| vec![idx]));

        for idx in chain {
            state[idx] = Visit::Done;
        }
    }

    units
}

fn first_index(members: &[usize]) -> usize {
    members.iter().copied().min().unwrap_or(usize::MAX)
}

fn step_for(members: &[usize]) -> Step {
    match members {
        [single] => Step::Rename(*single),
        cycle => Step::Cycle(cycle.to_vec()),
    }
}
