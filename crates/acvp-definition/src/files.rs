//! Serialized access to JSON config files.
//!
//! All raw reads and writes of definition config files go through one
//! [`FileAccess`]. It is always taken after an entity lock, never before, so
//! two definitions that alias one path through different locks still cannot
//! interleave their file I/O.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{DefinitionError, Result};

/// Reader/writer gate around config file I/O.
#[derive(Debug, Default)]
pub struct FileAccess {
    gate: RwLock<()>,
    writes: AtomicUsize,
}

impl FileAccess {
    /// Create a new gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a JSON document.
    pub fn read_json(&self, path: &Path) -> Result<Value> {
        let _gate = self.gate.read();
        parse_file(path)
    }

    /// Serialize a JSON document and replace the file contents.
    pub fn write_json(&self, path: &Path, doc: &Value) -> Result<()> {
        let _gate = self.gate.write();
        self.write_locked(path, doc)
    }

    /// Read, modify and conditionally write back one document while holding
    /// the gate exclusively. `modify` returns whether it changed anything;
    /// the file is only rewritten if it did.
    pub fn update_json<F>(&self, path: &Path, modify: F) -> Result<bool>
    where
        F: FnOnce(&mut Value) -> Result<bool>,
    {
        let _gate = self.gate.write();
        let mut doc = parse_file(path)?;
        let changed = modify(&mut doc)?;
        if changed {
            self.write_locked(path, &doc)?;
        }
        Ok(changed)
    }

    fn write_locked(&self, path: &Path, doc: &Value) -> Result<()> {
        let data = serde_json::to_string_pretty(doc)?;
        std::fs::write(path, data)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of file writes performed so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

fn parse_file(path: &Path) -> Result<Value> {
    let data = std::fs::read_to_string(path).map_err(|e| DefinitionError::ConfigParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    serde_json::from_str(&data).map_err(|e| DefinitionError::ConfigParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor.json");
        let files = FileAccess::new();

        files
            .write_json(&path, &serde_json::json!({ "vendorName": "Acme" }))
            .unwrap();
        let doc = files.read_json(&path).unwrap();
        assert_eq!(doc["vendorName"], "Acme");
        assert_eq!(files.writes(), 1);
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = FileAccess::new().read_json(&path).unwrap_err();
        assert!(matches!(err, DefinitionError::ConfigParse { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn unchanged_update_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oe.json");
        std::fs::write(&path, r#"{"procName":"Xeon"}"#).unwrap();
        let files = FileAccess::new();

        assert!(!files.update_json(&path, |_| Ok(false)).unwrap());
        assert_eq!(files.writes(), 0);

        let changed = files
            .update_json(&path, |doc| {
                doc["procName"] = "Epyc".into();
                Ok(true)
            })
            .unwrap();
        assert!(changed);
        assert_eq!(files.writes(), 1);
        assert_eq!(files.read_json(&path).unwrap()["procName"], "Epyc");
    }

    #[test]
    fn malformed_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(FileAccess::new().read_json(&path).is_err());
    }
}
