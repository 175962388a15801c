//! Enumerates the entries a batch starts from.
//!
//! The pipeline itself only consumes `Vec<Change>`; this module is the
//! collaborator that turns root directories into that list.

use crate::change::Change;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A direct child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    pub recursive: bool,
    /// Maximum recursion depth below each root; 0 means unlimited
    pub max_depth: usize,
    pub include_hidden: bool,
}

/// List the entries under each root, grouped by their parent directory.
///
/// Without `recursive` only the direct children of each root are returned.
/// When recursing, hidden directories are not descended into unless
/// `include_hidden` is set.
pub fn list_entries(
    roots: &[PathBuf],
    options: &WalkOptions,
) -> io::Result<BTreeMap<PathBuf, Vec<Entry>>> {
    let default_root = [PathBuf::from(".")];
    let roots = if roots.is_empty() {
        &default_root[..]
    } else {
        roots
    };

    let mut listing: BTreeMap<PathBuf, Vec<Entry>> = BTreeMap::new();

    for root in roots {
        let max_depth = match (options.recursive, options.max_depth) {
            (false, _) => 1,
            (true, 0) => usize::MAX,
            (true, depth) => depth,
        };

        listing.entry(root.clone()).or_default();

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(io::Error::from)?;
            let hidden = !options.include_hidden && is_hidden_entry(&entry);
            if hidden && entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            // Hidden entries directly under a root are left for the matcher
            if hidden && entry.depth() > 1 {
                continue;
            }
            let Some(parent) = entry.path().parent() else {
                continue;
            };
            listing
                .entry(parent.to_path_buf())
                .or_default()
                .push(Entry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir: entry.file_type().is_dir(),
                });
        }
    }

    Ok(listing)
}

/// Build the candidate set from a directory listing
pub fn candidates(listing: &BTreeMap<PathBuf, Vec<Entry>>) -> Vec<Change> {
    listing
        .iter()
        .flat_map(|(dir, entries)| {
            entries
                .iter()
                .map(move |entry| Change::new(dir.clone(), &entry.name, entry.is_dir))
        })
        .collect()
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    let base_dir = entry.path().parent().unwrap_or_else(|| Path::new("."));
    is_hidden(&name, base_dir).unwrap_or(false)
}

/// Dotfiles are hidden on unix-like systems
#[cfg(not(windows))]
pub fn is_hidden(name: &str, _base_dir: &Path) -> io::Result<bool> {
    Ok(name.starts_with('.'))
}

/// Windows uses the hidden file attribute instead of a naming convention
#[cfg(windows)]
pub fn is_hidden(name: &str, base_dir: &Path) -> io::Result<bool> {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    let metadata = std::fs::symlink_metadata(base_dir.join(name))?;
    Ok(metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
}
