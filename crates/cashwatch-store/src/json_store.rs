//! JSON file store.

use std::io::Write;
use std::path::{Path, PathBuf};

use cashwatch_core::{Error, Result};
use cashwatch_reconcile::Record;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Result of reading the store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Vec<Record>),
    /// No store yet (first run).
    Missing,
    /// The file is a JSON array but some of it had to be repaired or dropped.
    /// `records` holds every entry that could be recovered.
    Salvaged { records: Vec<Record>, reason: String },
    /// The file exists but is not a JSON array.
    Corrupt { reason: String },
    /// The file could not be read.
    Unreadable { reason: String },
}

impl LoadOutcome {
    /// Recovered records, or an empty store for every other failure mode.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Loaded(records) | Self::Salvaged { records, .. } => records,
            _ => Vec::new(),
        }
    }

    /// True only when the file existed and parsed.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Record store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> LoadOutcome {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Missing,
            Err(e) => {
                return LoadOutcome::Unreadable {
                    reason: e.to_string(),
                }
            }
        };

        let mut problems = Vec::new();
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                problems.push(format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()));
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let entries = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(entries)) => entries,
            Ok(other) => {
                return LoadOutcome::Corrupt {
                    reason: format!("expected a JSON array, got {}", json_kind(&other)),
                }
            }
            Err(e) => {
                return LoadOutcome::Corrupt {
                    reason: e.to_string(),
                }
            }
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut dropped = 0;
        for (i, entry) in entries.iter().enumerate() {
            match Record::from_stored(entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Dropping stored entry {} from {}: {}", i, self.path.display(), e);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            problems.push(format!("{} unparseable entries dropped", dropped));
        }

        debug!("Loaded {} records from {}", records.len(), self.path.display());
        if problems.is_empty() {
            LoadOutcome::Loaded(records)
        } else {
            LoadOutcome::Salvaged {
                records,
                reason: problems.join("; "),
            }
        }
    }

    /// Atomically replace the store with `records`.
    pub fn save(&self, records: &[Record]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut json = serde_json::to_string_pretty(records)?;
        json.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Storage(format!("replace {}: {}", self.path.display(), e)))?;

        debug!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Copy the current file aside as `<name>.corrupt-<unix-ts>` and return
    /// the backup path. Used before overwriting anything that did not load
    /// cleanly.
    pub fn backup_corrupt(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::Storage(format!("no file name in {}", self.path.display())))?;
        let backup = self.path.with_file_name(format!(
            "{}.corrupt-{}",
            file_name,
            chrono::Utc::now().timestamp()
        ));
        std::fs::copy(&self.path, &backup)?;
        info!("Backed up unreadable store to {}", backup.display());
        Ok(backup)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cashtag: Option<&str>, ca: Option<&str>, ts: &str) -> Record {
        Record {
            cashtag: cashtag.map(str::to_string),
            contract_address: ca.map(str::to_string),
            timestamp: ts.to_string(),
        }
    }

    fn test_store() -> (JsonRecordStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().join("cashtag_results.json"));
        (store, dir)
    }

    #[test]
    fn test_missing_file() {
        let (store, _dir) = test_store();
        assert_eq!(store.load(), LoadOutcome::Missing);
        assert!(store.load().into_records().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let (store, _dir) = test_store();
        let records = vec![
            record(Some("$FOO"), Some("0xAAA"), "01/20/2025, 14:30:00"),
            record(Some("unknown_cashtag"), None, "01/20/2025, 14:45:00"),
        ];
        store.save(&records).unwrap();
        assert_eq!(store.load(), LoadOutcome::Loaded(records));
    }

    #[test]
    fn test_pretty_printed_with_field_order() {
        let (store, _dir) = test_store();
        store
            .save(&[record(Some("$FOO"), None, "01/20/2025, 14:30:00")])
            .unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            "[\n  {\n    \"cashtag\": \"$FOO\",\n    \"contract_address\": null,\n    \"timestamp\": \"01/20/2025, 14:30:00\"\n  }\n]\n"
        );
    }

    #[test]
    fn test_corrupt_file() {
        let (store, _dir) = test_store();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), LoadOutcome::Corrupt { .. }));

        std::fs::write(store.path(), r#"{"cashtag": "$FOO"}"#).unwrap();
        match store.load() {
            LoadOutcome::Corrupt { reason } => assert!(reason.contains("an object")),
            other => panic!("expected corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_entries_without_timestamp_load() {
        let (store, _dir) = test_store();
        std::fs::write(
            store.path(),
            r#"[{"cashtag": "$OLD", "contract_address": "0x1", "timestamp": "T1"},
                {"cashtag": "$LEGACY", "contract_address": "0x2"}]"#,
        )
        .unwrap();

        let outcome = store.load();
        assert!(outcome.is_clean());
        let records = outcome.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, "T1");
        assert_eq!(records[1].cashtag.as_deref(), Some("$LEGACY"));
        assert_eq!(records[1].timestamp, cashwatch_reconcile::UNRECORDED_TIMESTAMP);
    }

    #[test]
    fn test_bad_entry_is_dropped_not_the_store() {
        let (store, _dir) = test_store();
        std::fs::write(
            store.path(),
            r#"[{"cashtag": "$OLD", "contract_address": "0x1", "timestamp": "T1"},
                {"cashtag": 42, "timestamp": "T2"},
                "stray"]"#,
        )
        .unwrap();

        match store.load() {
            LoadOutcome::Salvaged { records, reason } => {
                assert_eq!(records, vec![record(Some("$OLD"), Some("0x1"), "T1")]);
                assert!(reason.contains("2 unparseable entries"));
            }
            other => panic!("expected salvaged, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_salvaged() {
        let (store, _dir) = test_store();
        let mut bytes = br#"[{"cashtag": "$OLD", "contract_address": "0x1", "timestamp": "T1"},
            {"cashtag": "$BA"#
            .to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(br#"D", "contract_address": null, "timestamp": "T2"}]"#);
        std::fs::write(store.path(), &bytes).unwrap();

        let outcome = store.load();
        assert!(!outcome.is_clean());
        match outcome {
            LoadOutcome::Salvaged { records, reason } => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0], record(Some("$OLD"), Some("0x1"), "T1"));
                assert_eq!(records[1].cashtag.as_deref(), Some("$BA\u{FFFD}D"));
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("expected salvaged, got {:?}", other),
        }
    }

    #[test]
    fn test_save_over_directory_fails() {
        let (store, _dir) = test_store();
        std::fs::create_dir(store.path()).unwrap();
        assert!(store.save(&[record(Some("$A"), None, "T1")]).is_err());
    }

    #[test]
    fn test_unreadable_when_path_is_directory() {
        let (store, _dir) = test_store();
        std::fs::create_dir(store.path()).unwrap();
        let outcome = store.load();
        assert!(matches!(outcome, LoadOutcome::Unreadable { .. }));
        assert!(!outcome.is_clean());
    }

    #[test]
    fn test_save_replaces_and_leaves_no_temp_files() {
        let (store, dir) = test_store();
        store.save(&[record(Some("$A"), None, "T1")]).unwrap();
        store
            .save(&[record(Some("$A"), None, "T1"), record(Some("$B"), None, "T2")])
            .unwrap();

        assert_eq!(store.load().into_records().len(), 2);
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_backup_corrupt() {
        let (store, _dir) = test_store();
        std::fs::write(store.path(), "garbage").unwrap();
        let backup = store.backup_corrupt().unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "garbage");
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("cashtag_results.json.corrupt-"));
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path().join("nested").join("store.json"));
        store.save(&[]).unwrap();
        assert_eq!(store.load(), LoadOutcome::Loaded(Vec::new()));
    }
}
