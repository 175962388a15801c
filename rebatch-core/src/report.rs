use crate::change::{Change, OperationError};
use crate::conflict::ConflictReport;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use nu_ansi_term::Color as AnsiColor;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

/// Styles status text. Implementations hold no state so one can be shared
/// by every reporter in a run.
pub trait Formatter {
    fn success(&self, text: &str) -> String;
    fn failure(&self, text: &str) -> String;
    fn warn(&self, text: &str) -> String;

    /// Whether table cells should carry colors as well
    fn styled(&self) -> bool {
        false
    }
}

/// Terminal colors via ANSI escapes
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiFormatter;

impl Formatter for AnsiFormatter {
    fn success(&self, text: &str) -> String {
        AnsiColor::Green.paint(text).to_string()
    }

    fn failure(&self, text: &str) -> String {
        AnsiColor::Red.paint(text).to_string()
    }

    fn warn(&self, text: &str) -> String {
        AnsiColor::Yellow.paint(text).to_string()
    }

    fn styled(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl Formatter for PlainFormatter {
    fn success(&self, text: &str) -> String {
        text.to_string()
    }

    fn failure(&self, text: &str) -> String {
        text.to_string()
    }

    fn warn(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Determine whether to use colors based on explicit preference or terminal detection
pub fn should_use_color(use_color: Option<bool>) -> bool {
    use_color.unwrap_or_else(|| io::stdout().is_terminal())
}

/// Receives the user-facing output of a run
pub trait Reporter {
    /// Proposed changes of a dry run
    fn preview(&mut self, changes: &[Change]) -> io::Result<()>;
    /// Outcome of an applied batch that had failures
    fn results(&mut self, succeeded: &[Change], failed: &[OperationError]) -> io::Result<()>;
    fn conflicts(&mut self, report: &ConflictReport) -> io::Result<()>;
    fn no_matches(&mut self) -> io::Result<()>;
}

#[derive(Clone, Copy)]
enum Tone {
    Success,
    Failure,
}

/// Prints INPUT / OUTPUT / STATUS tables
pub struct TableReporter<W: Write, F: Formatter> {
    out: W,
    formatter: F,
}

impl<W: Write, F: Formatter> TableReporter<W, F> {
    pub fn new(out: W, formatter: F) -> Self {
        Self { out, formatter }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Disabled);
        if self.formatter.styled() {
            table.enforce_styling();
            table.set_header(vec![
                Cell::new("INPUT").fg(Color::Cyan),
                Cell::new("OUTPUT").fg(Color::Cyan),
                Cell::new("STATUS").fg(Color::Cyan),
            ]);
        } else {
            table.set_header(vec!["INPUT", "OUTPUT", "STATUS"]);
        }
        table
    }

    fn status_cell(&self, text: &str, tone: Tone) -> Cell {
        let cell = Cell::new(text);
        if !self.formatter.styled() {
            return cell;
        }
        match tone {
            Tone::Success => cell.fg(Color::Green),
            Tone::Failure => cell.fg(Color::Red),
        }
    }

    fn add_row(&self, table: &mut Table, change: &Change, status: &str, tone: Tone) {
        table.add_row(vec![
            Cell::new(display_path(&change.base_dir, &change.source)),
            Cell::new(display_path(&change.base_dir, &change.target)),
            self.status_cell(status, tone),
        ]);
    }
}

impl<W: Write, F: Formatter> Reporter for TableReporter<W, F> {
    fn preview(&mut self, changes: &[Change]) -> io::Result<()> {
        let mut table = self.table();
        for change in changes {
            self.add_row(&mut table, change, "ok", Tone::Success);
        }
        writeln!(self.out, "{table}")?;
        writeln!(
            self.out,
            "Append the {} flag to apply the above changes",
            self.formatter.warn("-x")
        )
    }

    fn results(&mut self, succeeded: &[Change], failed: &[OperationError]) -> io::Result<()> {
        let mut table = self.table();
        for change in succeeded {
            self.add_row(&mut table, change, "success", Tone::Success);
        }
        for failure in failed {
            self.add_row(
                &mut table,
                &failure.change,
                &failure.error.to_string(),
                Tone::Failure,
            );
        }
        writeln!(self.out, "{table}")
    }

    fn conflicts(&mut self, report: &ConflictReport) -> io::Result<()> {
        let mut table = self.table();
        for (kind, conflicts) in report.iter() {
            for conflict in conflicts {
                for change in &conflict.changes {
                    self.add_row(&mut table, change, kind.description(), Tone::Failure);
                }
            }
        }
        writeln!(self.out, "{table}")
    }

    fn no_matches(&mut self) -> io::Result<()> {
        writeln!(self.out, "Failed to match any files")
    }
}

/// Join for display, without a leading `./` for the current directory
fn display_path(base_dir: &Path, name: &str) -> String {
    let joined = base_dir.join(name);
    joined
        .strip_prefix(".")
        .unwrap_or(&joined)
        .display()
        .to_string()
}
