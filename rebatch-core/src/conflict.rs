use crate::change::{is_separator, split_dir, split_extension, Change};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Longest allowed path segment, in bytes
pub const MAX_SEGMENT_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    EmptyFilename,
    TrailingPeriod,
    ReservedName,
    ForbiddenCharacters,
    MaxLength,
    /// Target already exists on disk and is not being moved away
    FileExists,
    /// Several candidates resolve to the same path
    DuplicateTarget,
}

impl ConflictKind {
    /// Structural problems cannot be fixed by renaming the target, only by
    /// dropping the candidate
    pub fn is_structural(self) -> bool {
        !matches!(self, Self::FileExists | Self::DuplicateTarget)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::EmptyFilename => "Empty filename",
            Self::TrailingPeriod => "Trailing periods are not allowed",
            Self::ReservedName => "Reserved filename",
            Self::ForbiddenCharacters => "Forbidden characters",
            Self::MaxLength => "Filename too long",
            Self::FileExists => "File exists",
            Self::DuplicateTarget => "Overwriting newly renamed path",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One conflicting target and the candidates that produce it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub target: PathBuf,
    pub changes: Vec<Change>,
}

/// All conflicts of a batch, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport(BTreeMap<ConflictKind, Vec<Conflict>>);

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of conflicts across all kinds
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, kind: ConflictKind) -> &[Conflict] {
        self.0.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConflictKind, &[Conflict])> {
        self.0.iter().map(|(kind, list)| (*kind, list.as_slice()))
    }

    fn push(&mut self, kind: ConflictKind, conflict: Conflict) {
        self.0.entry(kind).or_default().push(conflict);
    }
}

/// Drop candidates whose name does not change
pub fn remove_unchanged(changes: &mut Vec<Change>) {
    let before = changes.len();
    changes.retain(|change| !change.is_unchanged());
    if changes.len() != before {
        tracing::debug!(removed = before - changes.len(), "dropped unchanged names");
    }
}

/// Check every candidate's target and collect the problems found
pub fn validate(changes: &[Change]) -> ConflictReport {
    let mut report = ConflictReport::default();
    let sources = source_keys(changes);
    let mut by_target: HashMap<PathBuf, Vec<&Change>> = HashMap::new();
    let mut target_order = Vec::new();

    for change in changes {
        if let Some(kind) = structural_problem(&change.target) {
            report.push(
                kind,
                Conflict {
                    target: change.target_path(),
                    changes: vec![change.clone()],
                },
            );
            continue;
        }

        if blocks_on_disk(change, &sources) {
            report.push(
                ConflictKind::FileExists,
                Conflict {
                    target: change.target_path(),
                    changes: vec![change.clone()],
                },
            );
        }

        let key = change.target_key();
        let group = by_target.entry(key.clone()).or_default();
        if group.is_empty() {
            target_order.push(key);
        }
        group.push(change);
    }

    for key in target_order {
        let group = &by_target[&key];
        if group.len() > 1 {
            report.push(
                ConflictKind::DuplicateTarget,
                Conflict {
                    target: group[0].target_path(),
                    changes: group.iter().map(|c| (*c).clone()).collect(),
                },
            );
        }
    }

    if !report.is_empty() {
        tracing::debug!(conflicts = report.len(), "conflicts detected");
    }
    report
}

/// Resolve conflicts in place.
///
/// Structurally invalid candidates are dropped. Candidates whose target is
/// taken get a ` (N)` suffix before the extension, with the lowest free `N`
/// starting at 2. Returns the number of candidates dropped or renamed.
pub fn auto_fix(changes: &mut Vec<Change>) -> usize {
    let before = changes.len();
    changes.retain(|change| structural_problem(&change.target).is_none());
    let mut fixed = before - changes.len();

    let sources = source_keys(changes);
    let taken = |c: &Change, claimed: &HashSet<PathBuf>| {
        claimed.contains(&c.target_key()) || blocks_on_disk(c, &sources)
    };
    let mut claimed = HashSet::new();

    for change in changes.iter_mut() {
        if taken(change, &claimed) {
            let original = change.target.clone();
            let mut n = 2;
            loop {
                change.target = with_suffix(&original, n);
                if !taken(change, &claimed) {
                    break;
                }
                n += 1;
            }
            tracing::debug!(from = %original, to = %change.target, "auto-fixed target");
            fixed += 1;
        }
        claimed.insert(change.target_key());
    }

    // Renaming a target may have made it structurally invalid (too long)
    let before = changes.len();
    changes.retain(|change| structural_problem(&change.target).is_none());
    fixed += before - changes.len();

    fixed
}

fn source_keys(changes: &[Change]) -> HashSet<PathBuf> {
    changes.iter().map(Change::source_key).collect()
}

/// True when the target exists and will not be vacated by this batch
fn blocks_on_disk(change: &Change, sources: &HashSet<PathBuf>) -> bool {
    let target_key = change.target_key();
    if sources.contains(&target_key) {
        return false;
    }
    if is_case_only(&change.source_key(), &target_key) {
        return false;
    }
    target_key.symlink_metadata().is_ok()
}

fn is_case_only(source: &Path, target: &Path) -> bool {
    source != target
        && source.to_string_lossy().to_lowercase() == target.to_string_lossy().to_lowercase()
}

/// Insert ` (n)` before the extension of the last segment
fn with_suffix(target: &str, n: usize) -> String {
    let (dir, name) = split_dir(target);
    let (stem, ext) = split_extension(name);
    let renamed = format!("{} ({}){}", stem, n, ext);
    if dir.is_empty() {
        renamed
    } else {
        format!("{}{}{}", dir, &target[dir.len()..=dir.len()], renamed)
    }
}

fn structural_problem(target: &str) -> Option<ConflictKind> {
    let segments: Vec<&str> = target.split(is_separator).collect();
    match segments.last() {
        None | Some(&"" | &"." | &"..") => return Some(ConflictKind::EmptyFilename),
        Some(_) => {},
    }

    for segment in segments {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        if segment.ends_with('.') {
            return Some(ConflictKind::TrailingPeriod);
        }
        if cfg!(windows) && is_windows_reserved(segment) {
            return Some(ConflictKind::ReservedName);
        }
        if segment.chars().any(is_forbidden_char) {
            return Some(ConflictKind::ForbiddenCharacters);
        }
        if segment.len() > MAX_SEGMENT_LEN {
            return Some(ConflictKind::MaxLength);
        }
    }
    None
}

/// Check if a filename is a Windows reserved device name (`CON`, `nul.txt`, ...).
/// Only Windows rejects these; elsewhere they are ordinary names.
pub fn is_windows_reserved(name: &str) -> bool {
    let base = name.split('.').next().unwrap_or(name).to_uppercase();
    WINDOWS_RESERVED.contains(&base.as_str())
}

fn is_forbidden_char(c: char) -> bool {
    c == '\0' || (cfg!(windows) && matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
}
