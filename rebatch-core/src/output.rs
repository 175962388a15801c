use crate::change::Change;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write;
use std::path::PathBuf;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Preview,
    Apply,
    UndoPreview,
    Undo,
}

impl RunMode {
    pub fn is_dry_run(self) -> bool {
        matches!(self, Self::Preview | Self::UndoPreview)
    }
}

/// Result of a successful rename or undo run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub mode: RunMode,
    /// Proposed changes for a dry run, applied changes otherwise
    pub changes: Vec<Change>,
    /// Candidates dropped or re-targeted by auto-fix
    pub fixed_conflicts: usize,
    /// Journal written for this run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<PathBuf>,
}

/// Trait for formatting output in different formats
pub trait OutputFormatter {
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => self.format_json(),
            OutputFormat::Summary => self.format_summary(),
        }
    }

    fn format_json(&self) -> String;
    fn format_summary(&self) -> String;
}

impl OutputFormatter for RunResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": true,
            "mode": self.mode,
            "dry_run": self.mode.is_dry_run(),
            "summary": {
                "changes": self.changes.len(),
                "fixed_conflicts": self.fixed_conflicts,
            },
            "changes": self.changes,
            "journal": self.journal,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        let mut output = String::new();
        let count = self.changes.len();

        match self.mode {
            RunMode::Preview | RunMode::UndoPreview => {
                writeln!(output, "{} change(s) previewed, nothing renamed", count).unwrap();
            },
            RunMode::Apply => {
                writeln!(output, "✓ Renamed {} item(s)", count).unwrap();
            },
            RunMode::Undo => {
                writeln!(output, "✓ Reverted {} rename(s)", count).unwrap();
            },
        }

        if self.fixed_conflicts > 0 {
            writeln!(output, "Fixed {} conflict(s)", self.fixed_conflicts).unwrap();
        }
        if let Some(journal) = &self.journal {
            writeln!(
                output,
                "Undo with: rebatch --undo {} -x",
                journal.display()
            )
            .unwrap();
        }

        output
    }
}
