//! Persistence for the single user preference: the output directory.
//!
//! The store is a flat JSON object on disk, rewritten wholesale on every
//! update so unknown keys written by newer versions survive a
//! read-modify-write cycle. Corruption is treated the same as absence:
//! defaults are re-established and the caller never sees an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.json";
pub const OUTPUT_DIR_KEY: &str = "path";

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File presence only; the content is not validated here.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn default_document() -> Document {
        let mut doc = Map::new();
        doc.insert(OUTPUT_DIR_KEY.to_string(), Value::String(String::new()));
        doc
    }

    /// Overwrites the file with `{"path": ""}`. Write failures are logged
    /// and swallowed; startup must not die on a broken config.
    pub fn write_defaults(&self) {
        if let Err(e) = self.write_document(&Self::default_document()) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not write default config",
            );
        }
    }

    /// Reads the document, recreating the file with defaults if it is
    /// absent or unparseable. If even the freshly written defaults cannot
    /// be read back, returns an in-memory fallback without touching disk
    /// again. The returned document always contains [`OUTPUT_DIR_KEY`].
    pub fn read(&self) -> Document {
        if !self.exists() {
            self.write_defaults();
        }

        let mut doc = match self.try_read() {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "config unreadable, resetting to defaults",
                );
                self.write_defaults();
                match self.try_read() {
                    Ok(doc) => doc,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read config after reset");
                        return Self::default_document();
                    }
                }
            }
        };

        doc.entry(OUTPUT_DIR_KEY)
            .or_insert_with(|| Value::String(String::new()));
        doc
    }

    /// Sets one key and writes the whole document back. Last-write-wins;
    /// the store is only ever driven from the UI loop so there is no
    /// concurrent writer to coordinate with. Unlike `write_defaults`, a
    /// failure here is reported so the UI can warn the user.
    pub fn write(&self, key: &str, value: impl Into<Value>) -> Result<(), SettingsError> {
        let mut doc = self.read();
        doc.insert(key.to_string(), value.into());
        self.write_document(&doc)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    fn try_read(&self) -> Result<Document, SettingsError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_document(&self, doc: &Document) -> Result<(), SettingsError> {
        // 4-space indentation, matching the on-disk format users already have.
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut ser)?;
        fs::write(&self.path, buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("config.json"))
    }

    #[test]
    fn read_creates_defaults_when_absent() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.exists());

        let doc = store.read();
        assert_eq!(doc.get(OUTPUT_DIR_KEY), Some(&Value::String(String::new())));
        assert!(store.exists());
    }

    #[test]
    fn defaults_are_pretty_printed_with_four_spaces() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        store.write_defaults();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "{\n    \"path\": \"\"\n}");
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.write(OUTPUT_DIR_KEY, "/a/b").unwrap();
        let doc = store.read();
        assert_eq!(doc.get(OUTPUT_DIR_KEY), Some(&Value::String("/a/b".into())));
    }

    #[test]
    fn corruption_is_repaired_to_defaults() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{not json at all").unwrap();

        let doc = store.read();
        assert_eq!(doc.get(OUTPUT_DIR_KEY), Some(&Value::String(String::new())));

        // The file on disk must be valid JSON again afterwards.
        let content = fs::read_to_string(store.path()).unwrap();
        let reparsed: Document = serde_json::from_str(&content).unwrap();
        assert!(reparsed.contains_key(OUTPUT_DIR_KEY));
    }

    #[test]
    fn unknown_keys_survive_a_keyed_write() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "{\n    \"path\": \"/old\",\n    \"theme\": \"dark\"\n}",
        )
        .unwrap();

        store.write(OUTPUT_DIR_KEY, "/new").unwrap();

        let doc = store.read();
        assert_eq!(doc.get(OUTPUT_DIR_KEY), Some(&Value::String("/new".into())));
        assert_eq!(doc.get("theme"), Some(&Value::String("dark".into())));
    }

    #[test]
    fn get_returns_none_for_absent_key() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get("nope"), None);
        assert_eq!(store.get(OUTPUT_DIR_KEY), Some(Value::String(String::new())));
    }
}
