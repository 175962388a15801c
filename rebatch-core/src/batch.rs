use crate::error::{RebatchError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Raw, uncompiled options for a batch run (what the CLI or a config file
/// supplies). Turned into a [`BatchConfig`] once, before any filesystem access.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub find: String,
    pub replace: String,
    pub undo_file: Option<PathBuf>,
    pub start_number: i64,
    pub exec: bool,
    pub fix_conflicts: bool,
    pub include_dir: bool,
    pub only_dir: bool,
    pub include_hidden: bool,
    pub ignore_case: bool,
    pub ignore_ext: bool,
    pub string_mode: bool,
    pub exclude: Vec<String>,
    pub sort: Option<SortKey>,
    pub reverse_sort: bool,
    pub output_file: Option<PathBuf>,
    pub recovery_dir: PathBuf,
    pub quiet: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            find: String::new(),
            replace: String::new(),
            undo_file: None,
            start_number: 1,
            exec: false,
            fix_conflicts: false,
            include_dir: false,
            only_dir: false,
            include_hidden: false,
            ignore_case: false,
            ignore_ext: false,
            string_mode: false,
            exclude: Vec::new(),
            sort: None,
            reverse_sort: false,
            output_file: None,
            recovery_dir: PathBuf::from("."),
            quiet: false,
        }
    }
}

/// How candidate names are matched against the find pattern
#[derive(Debug, Clone)]
pub enum Finder {
    Regex(Regex),
    /// Plain substring matching. `regex` is the escaped needle, used for
    /// case-insensitive replacement and for per-match case transforms.
    Literal {
        needle: String,
        ignore_case: bool,
        regex: Regex,
    },
}

impl Finder {
    /// The regex equivalent of this finder
    pub fn regex(&self) -> &Regex {
        match self {
            Self::Regex(regex) | Self::Literal { regex, .. } => regex,
        }
    }
}

/// What the replacement does to each match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformMode {
    Substitute(String),
    UppercaseMatches,
    LowercaseMatches,
    TitlecaseMatches,
}

impl TransformMode {
    /// Recognizes the `\Cu`, `\Cl` and `\Ct` replacement forms
    pub fn parse(replacement: &str) -> Self {
        match replacement {
            r"\Cu" => Self::UppercaseMatches,
            r"\Cl" => Self::LowercaseMatches,
            r"\Ct" => Self::TitlecaseMatches,
            other => Self::Substitute(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirMode {
    FilesOnly,
    IncludeDirs,
    DirsOnly,
}

impl DirMode {
    pub fn includes_dirs(self) -> bool {
        !matches!(self, Self::FilesOnly)
    }
}

/// File attribute used to order candidates before numbering. Written as
/// `size`, `mtime`, `atime`, `btime` or `ctime` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortKey {
    Size,
    Modified,
    Accessed,
    Birth,
    Changed,
}

impl FromStr for SortKey {
    type Err = RebatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "size" => Ok(Self::Size),
            "mtime" => Ok(Self::Modified),
            "atime" => Ok(Self::Accessed),
            "btime" => Ok(Self::Birth),
            "ctime" => Ok(Self::Changed),
            _ => Err(RebatchError::InvalidSortKey(s.to_string())),
        }
    }
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Modified => "mtime",
            Self::Accessed => "atime",
            Self::Birth => "btime",
            Self::Changed => "ctime",
        }
    }
}

impl TryFrom<String> for SortKey {
    type Error = RebatchError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    /// Ascending instead of the default descending order
    pub reverse: bool,
}

/// Compiled, immutable configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub find: Finder,
    pub transform: TransformMode,
    pub start_number: i64,
    pub exec: bool,
    pub fix_conflicts: bool,
    pub dir_mode: DirMode,
    pub include_hidden: bool,
    pub ignore_ext: bool,
    pub exclude: Option<Regex>,
    pub sort: Option<SortSpec>,
    pub output_file: Option<PathBuf>,
    pub undo_file: Option<PathBuf>,
    pub recovery_dir: PathBuf,
    pub quiet: bool,
}

impl BatchConfig {
    pub fn new(options: BatchOptions) -> Result<Self> {
        if options.find.is_empty() && options.replace.is_empty() && options.undo_file.is_none() {
            return Err(RebatchError::MissingArgument);
        }

        let find = compile_finder(&options.find, options.string_mode, options.ignore_case)?;

        let exclude = if options.exclude.is_empty() {
            None
        } else {
            let combined = options.exclude.join("|");
            let regex = Regex::new(&combined).map_err(|source| RebatchError::InvalidExclude {
                pattern: combined.clone(),
                source,
            })?;
            Some(regex)
        };

        let sort = options.sort.map(|key| SortSpec {
            key,
            reverse: options.reverse_sort,
        });

        let dir_mode = if options.only_dir {
            DirMode::DirsOnly
        } else if options.include_dir {
            DirMode::IncludeDirs
        } else {
            DirMode::FilesOnly
        };

        Ok(Self {
            find,
            transform: TransformMode::parse(&options.replace),
            start_number: options.start_number,
            exec: options.exec,
            fix_conflicts: options.fix_conflicts,
            dir_mode,
            include_hidden: options.include_hidden,
            ignore_ext: options.ignore_ext,
            exclude,
            sort,
            output_file: options.output_file,
            undo_file: options.undo_file,
            recovery_dir: options.recovery_dir,
            quiet: options.quiet,
        })
    }

    pub fn is_undo(&self) -> bool {
        self.undo_file.is_some()
    }
}

fn compile_finder(find: &str, string_mode: bool, ignore_case: bool) -> Result<Finder> {
    let flags = if ignore_case { "(?i)" } else { "" };

    if string_mode {
        // An empty needle stands for the whole name
        let pattern = if find.is_empty() {
            format!("{}.*", flags)
        } else {
            format!("{}{}", flags, regex::escape(find))
        };
        let regex = Regex::new(&pattern).map_err(|source| RebatchError::InvalidPattern {
            pattern: find.to_string(),
            source,
        })?;
        return Ok(Finder::Literal {
            needle: find.to_string(),
            ignore_case,
            regex,
        });
    }

    let body = if find.is_empty() { ".*" } else { find };
    let pattern = format!("{}{}", flags, body);
    Regex::new(&pattern)
        .map(Finder::Regex)
        .map_err(|source| RebatchError::InvalidPattern {
            pattern: find.to_string(),
            source,
        })
}
