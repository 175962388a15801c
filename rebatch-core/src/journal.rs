use crate::change::Change;
use crate::error::{RebatchError, Result};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// On-disk record of an applied batch, usable as undo input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalFile {
    /// RFC 3339 timestamp of when the batch ran
    pub date: String,
    pub operations: Vec<Change>,
}

impl JournalFile {
    pub fn new(operations: Vec<Change>) -> Self {
        Self {
            date: Local::now().to_rfc3339(),
            operations,
        }
    }

    /// The changes that undo this journal, in recorded order
    pub fn reversed(&self) -> Vec<Change> {
        self.operations.iter().map(Change::reversed).collect()
    }
}

/// Write `changes` as a journal, replacing any existing file at `path`
pub fn write_journal(path: &Path, changes: &[Change]) -> Result<()> {
    let journal = JournalFile::new(changes.to_vec());
    write_file(path, &journal).map_err(|source| RebatchError::JournalUnsaved {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), entries = changes.len(), "journal written");
    Ok(())
}

fn write_file(path: &Path, journal: &JournalFile) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    journal.serialize(&mut serializer)?;
    writer.flush()
}

pub fn read_journal(path: &Path) -> Result<JournalFile> {
    let content = fs::read_to_string(path).map_err(|source| RebatchError::JournalRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RebatchError::JournalParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Name of the file that records the successful part of a failed batch,
/// e.g. `.f2_2024-03-9T14-05-07PM.json`
pub fn recovery_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(".f2_{}.json", now.format("%Y-%m-%-dT%H-%M-%S%p"))
}

pub fn recovery_file_path(dir: &Path) -> PathBuf {
    dir.join(recovery_file_name(&Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<Change> {
        vec![
            Change::new("photos", "a.jpg", false).with_target("b.jpg"),
            Change::new("photos", "old", true).with_target("new"),
        ]
    }

    #[test]
    fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("journal.json");

        write_journal(&path, &sample()).unwrap();
        let journal = read_journal(&path).unwrap();

        assert_eq!(journal.operations, sample());
        assert!(DateTime::parse_from_rfc3339(&journal.date).is_ok());
    }

    #[test]
    fn test_journal_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("journal.json");
        write_journal(&path, &sample()[..1]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n    \"date\": "));
        assert!(content.contains("\n    \"operations\": [\n        {\n            \"base_dir\": \"photos\""));
        assert!(content.contains("\"is_dir\": false"));
    }

    #[test]
    fn test_reversed_swaps_every_entry() {
        let journal = JournalFile::new(sample());
        let reversed = journal.reversed();
        assert_eq!(reversed[0].source, "b.jpg");
        assert_eq!(reversed[0].target, "a.jpg");
        assert_eq!(reversed[1].source, "new");
        assert!(reversed[1].is_dir);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("run.json");
        write_journal(&path, &sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_path_is_unsaved_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = write_journal(&blocker.join("journal.json"), &sample()).unwrap_err();
        assert!(matches!(err, RebatchError::JournalUnsaved { .. }));
    }

    #[test]
    fn test_read_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = read_journal(&temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, RebatchError::JournalRead { .. }));

        let bad = temp_dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        let err = read_journal(&bad).unwrap_err();
        assert!(matches!(err, RebatchError::JournalParse { .. }));
    }

    #[test]
    fn test_recovery_file_name_format() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(recovery_file_name(&now), ".f2_2024-03-9T14-05-07PM.json");

        let morning = chrono::Utc.with_ymd_and_hms(2024, 11, 23, 9, 0, 0).unwrap();
        assert_eq!(recovery_file_name(&morning), ".f2_2024-11-23T09-00-00AM.json");
    }
}
