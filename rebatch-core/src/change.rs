use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// A single entry proposed for renaming.
///
/// `source` and `target` are relative to `base_dir`. The serialized form is
/// the journal record format and must stay stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub base_dir: PathBuf,
    pub source: String,
    pub target: String,
    pub is_dir: bool,
}

impl Change {
    /// Create a candidate with no target yet
    pub fn new(base_dir: impl Into<PathBuf>, source: &str, is_dir: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            source: clean_name(source),
            target: String::new(),
            is_dir,
        }
    }

    /// Builder-style setter used mostly by tests and the journal reader
    #[must_use]
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn source_path(&self) -> PathBuf {
        self.base_dir.join(&self.source)
    }

    pub fn target_path(&self) -> PathBuf {
        self.base_dir.join(&self.target)
    }

    /// Last path segment of the source
    pub fn file_name(&self) -> &str {
        last_segment(&self.source)
    }

    pub fn is_unchanged(&self) -> bool {
        self.target == self.source
    }

    /// The same change with source and target swapped
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            base_dir: self.base_dir.clone(),
            source: self.target.clone(),
            target: self.source.clone(),
            is_dir: self.is_dir,
        }
    }

    /// Absolute, lexically normalized source path used for identity checks
    pub fn source_key(&self) -> PathBuf {
        absolute_key(&self.source_path())
    }

    /// Absolute, lexically normalized target path used for identity checks
    pub fn target_key(&self) -> PathBuf {
        absolute_key(&self.target_path())
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {}",
            self.source_path().display(),
            self.target_path().display()
        )
    }
}

/// A rename that failed while the batch was being applied
#[derive(Debug)]
pub struct OperationError {
    pub change: Change,
    pub error: io::Error,
}

impl OperationError {
    pub fn new(change: Change, error: io::Error) -> Self {
        Self { change, error }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.change, self.error)
    }
}

pub(crate) fn is_separator(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit(is_separator).next().unwrap_or(name)
}

/// Split a relative name into its directory part and final segment.
/// The directory part is empty when the name has no separator.
pub(crate) fn split_dir(name: &str) -> (&str, &str) {
    match name.rfind(is_separator) {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    }
}

/// Split a file name into stem and extension (extension keeps its dot).
///
/// Dotfiles such as `.bashrc` have no extension.
pub(crate) fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(idx) => (&file_name[..idx], &file_name[idx..]),
    }
}

/// Lexically clean a relative name: collapse repeated separators, drop `.`
/// segments and fold `dir/..` pairs. Returns an empty string when nothing is
/// left.
pub fn clean_name(name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split(is_separator) {
        match segment {
            "" | "." => {},
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            },
            other => segments.push(other),
        }
    }
    segments.join(&MAIN_SEPARATOR.to_string())
}

/// Join a directory part and a name the way the transformer recombines
/// targets. An empty name stays empty so it can be reported as such.
pub(crate) fn join_name(dir: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    if dir.is_empty() {
        clean_name(name)
    } else {
        clean_name(&format!("{}{}{}", dir, MAIN_SEPARATOR, name))
    }
}

/// Make a path absolute (relative to the current directory) and fold `.`
/// and `..` components without touching the filesystem.
pub(crate) fn absolute_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                normalized.pop();
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
