// verify.rs — Check an exported journal's hash chain.

use std::path::Path;

use warden_audit::{AuditError, Journal};

pub fn execute(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("No journal found at {}", path.display());
    }

    match Journal::verify_file(path) {
        Ok(entries) => {
            println!(
                "Journal verified: {} entr{}, hash chain intact.",
                entries,
                if entries == 1 { "y" } else { "ies" }
            );
            Ok(())
        }
        Err(AuditError::IntegrityViolation {
            line,
            expected,
            actual,
        }) => {
            println!("INTEGRITY VIOLATION at line {}:", line);
            println!("  Expected previous_hash: {}", expected);
            println!("  Actual previous_hash:   {}", actual);
            println!();
            println!("The journal may have been tampered with.");
            anyhow::bail!("Journal integrity check failed");
        }
        Err(AuditError::SequenceGap {
            line,
            expected,
            actual,
        }) => {
            println!(
                "SEQUENCE GAP at line {}: expected seq {}, found {}",
                line, expected, actual
            );
            anyhow::bail!("Journal integrity check failed");
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn write_journal(path: &Path) {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut journal = Journal::new();
        journal.record(at, "policy_add", "root", vec![]).unwrap();
        journal.record(at, "create_access_request", "ph1", vec![]).unwrap();
        journal.export_jsonl(path).unwrap();
    }

    #[test]
    fn intact_journal_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        write_journal(&path);
        assert!(execute(&path).is_ok());
    }

    #[test]
    fn tampered_journal_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        write_journal(&path);
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replacen("\"root\"", "\"mallory\"", 1)).unwrap();
        assert!(execute(&path).is_err());
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(execute(&dir.path().join("nope.jsonl")).is_err());
    }
}
