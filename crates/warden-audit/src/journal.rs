// journal.rs — Hash-chained record of committed operations.
//
// One entry per successful operation, holding the events it produced. Each
// entry's `previous_hash` is the SHA-256 of the previous entry's JSON line,
// so the chain (and its head hash) is a fingerprint of the whole history.
// Aborted operations never reach the journal.
//
// The journal lives in memory; `export_jsonl` writes it out and
// `verify_file` checks an exported copy.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::event::AccessEvent;
use crate::hasher;

/// One committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    /// Operation name, e.g. `create_access_request`.
    pub operation: String,
    /// Who issued the operation.
    pub principal: String,
    pub events: Vec<AccessEvent>,
    pub previous_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    last_hash: Option<String>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed operation and return its sequence number.
    pub fn record(
        &mut self,
        at: DateTime<Utc>,
        operation: &str,
        principal: &str,
        events: Vec<AccessEvent>,
    ) -> Result<u64, AuditError> {
        let entry = JournalEntry {
            seq: self.entries.len() as u64,
            at,
            operation: operation.to_string(),
            principal: principal.to_string(),
            events,
            previous_hash: self.last_hash.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        self.last_hash = Some(hasher::hash_str(&json));
        let seq = entry.seq;
        self.entries.push(entry);
        Ok(seq)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the most recent entry. `None` for an empty journal.
    pub fn head_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// All events in commit order.
    pub fn events(&self) -> impl Iterator<Item = &AccessEvent> {
        self.entries.iter().flat_map(|e| e.events.iter())
    }

    /// Write the journal as JSONL, one entry per line. Overwrites `path`.
    pub fn export_jsonl(&self, path: impl AsRef<Path>) -> Result<(), AuditError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(writer, "{}", serde_json::to_string(entry)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read entries back from an exported file. Does not verify the chain.
    pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>, AuditError> {
        let mut entries = Vec::new();
        for line in read_lines(path.as_ref())? {
            let (_, line) = line?;
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Verify an exported journal's hash chain and sequence numbering.
    /// Returns the number of entries checked.
    pub fn verify_file(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut count = 0usize;

        for line in read_lines(path.as_ref())? {
            let (line_num, line) = line?;
            let entry: JournalEntry = serde_json::from_str(&line)?;

            if entry.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: entry.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            if entry.seq != count as u64 {
                return Err(AuditError::SequenceGap {
                    line: line_num,
                    expected: count as u64,
                    actual: entry.seq,
                });
            }

            // Hash the raw line; re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }

        Ok(count)
    }
}

/// Non-blank lines of `path` with their 1-based line numbers.
fn read_lines(
    path: &Path,
) -> Result<impl Iterator<Item = Result<(usize, String), AuditError>>, AuditError> {
    let file = File::open(path).map_err(|source| AuditError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(l) if l.trim().is_empty() => None,
            Ok(l) => Some(Ok((i + 1, l))),
            Err(e) => Some(Err(AuditError::from(e))),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn sample_journal() -> Journal {
        let mut journal = Journal::new();
        journal
            .record(
                t0(),
                "create_access_request",
                "alice",
                vec![AccessEvent::AccessRequestCreated {
                    id: 0,
                    requester: "alice".into(),
                    resource: "GlobalResourceTable".into(),
                    action: warden_policy::Action::View,
                    required_quorum: 2,
                }],
            )
            .unwrap();
        journal
            .record(
                t0(),
                "handle_access_request",
                "bob",
                vec![AccessEvent::AccessGranted {
                    id: 0,
                    requester: "alice".into(),
                }],
            )
            .unwrap();
        journal
    }

    #[test]
    fn entries_are_chained() {
        let journal = sample_journal();
        let entries = journal.entries();
        assert_eq!(entries[0].previous_hash, None);
        assert!(entries[1].previous_hash.is_some());
        assert_eq!(entries[1].seq, 1);
        assert_eq!(journal.events().count(), 2);
        assert!(journal.head_hash().is_some());
    }

    #[test]
    fn identical_histories_share_head_hash() {
        assert_eq!(sample_journal().head_hash(), sample_journal().head_hash());
        assert_eq!(Journal::new().head_hash(), None);
    }

    #[test]
    fn export_verify_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let journal = sample_journal();
        journal.export_jsonl(&path).unwrap();

        assert_eq!(Journal::verify_file(&path).unwrap(), 2);
        let entries = Journal::read_jsonl(&path).unwrap();
        assert_eq!(entries, journal.entries());
    }

    #[test]
    fn tampered_export_fails_verification() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        sample_journal().export_jsonl(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replacen("\"alice\"", "\"mallory\"", 1);
        std::fs::write(&path, tampered).unwrap();

        match Journal::verify_file(&path) {
            Err(AuditError::IntegrityViolation { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected IntegrityViolation, got {:?}", other),
        }
    }

    #[test]
    fn dropped_first_line_fails_verification() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        sample_journal().export_jsonl(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let rest: Vec<&str> = content.lines().skip(1).collect();
        std::fs::write(&path, rest.join("\n")).unwrap();

        assert!(matches!(
            Journal::verify_file(&path),
            Err(AuditError::IntegrityViolation { line: 1, .. })
        ));
    }
}
