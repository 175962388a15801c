use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

use super::types::{OutputFormat, SortArg};

/// Batch rename files and directories with regex, numbering and undo
#[derive(Parser, Debug)]
#[command(name = "rebatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Search pattern (a regex unless --string-mode is set)
    #[arg(short = 'f', long)]
    pub find: Option<String>,

    /// Replacement. Supports $1 / ${name} groups, %03d numbering,
    /// {{f}} {{p}} {{ext}} variables and \Cu \Cl \Ct case transforms
    #[arg(short = 'r', long, verbatim_doc_comment)]
    pub replace: Option<String>,

    /// Revert the renames recorded in a journal file
    #[arg(short = 'u', long, value_name = "FILE", conflicts_with_all = ["find", "replace"])]
    pub undo: Option<PathBuf>,

    /// Apply the changes instead of previewing them
    #[arg(short = 'x', long)]
    pub exec: bool,

    /// Fix conflicts automatically by dropping or suffixing targets
    #[arg(short = 'F', long)]
    pub fix_conflicts: bool,

    /// Rename directories as well as files
    #[arg(short = 'd', long)]
    pub include_dir: bool,

    /// Rename directories only
    #[arg(short = 'D', long)]
    pub only_dir: bool,

    /// Include hidden files and directories
    #[arg(short = 'H', long)]
    pub hidden: bool,

    /// Match case-insensitively
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Leave file extensions out of matching and replacement
    #[arg(short = 'e', long)]
    pub ignore_ext: bool,

    /// Walk directories recursively
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Maximum recursion depth (0 = unlimited)
    #[arg(short = 'm', long, value_name = "N", default_value_t = 0)]
    pub max_depth: usize,

    /// Treat the find pattern as a literal string
    #[arg(short = 's', long)]
    pub string_mode: bool,

    /// Skip names matching this regex (repeatable)
    #[arg(short = 'E', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// First value used by numbering tokens
    #[arg(
        short = 'n',
        long = "start-num",
        value_name = "N",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub start_num: i64,

    /// Sort matches by a file attribute, largest or newest first
    #[arg(long, value_enum, value_name = "KEY", conflicts_with = "sortr")]
    pub sort: Option<SortArg>,

    /// Sort matches by a file attribute, smallest or oldest first
    #[arg(long, value_enum, value_name = "KEY")]
    pub sortr: Option<SortArg>,

    /// Save the applied renames to this journal file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Suppress tables and summaries
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log debug events to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Directories whose entries are renamed (defaults to the current directory)
    pub paths: Vec<PathBuf>,
}
