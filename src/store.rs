//! Key-value persistence for the cross-session roughness histogram.
//!
//! The histogram and the list of already-merged session IDs live under two
//! fixed keys. Writers are last-write-wins; there is no locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{CalibrationError, Result};
use crate::histogram::{DanHistogram, PersistentHistogram};

pub const HISTOGRAM_KEY: &str = "road_dan_histogram";
pub const MERGED_SESSIONS_KEY: &str = "road_dan_merged_sessions";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Write several keys together. Either all of them land or none do.
    fn set_many(&mut self, entries: Vec<(&str, Value)>) -> Result<()>;
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn set_many(&mut self, entries: Vec<(&str, Value)>) -> Result<()> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// All keys in one pretty-printed JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_all(&self) -> Result<serde_json::Map<String, Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(CalibrationError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.set_many(vec![(key, value)])
    }

    /// One read-modify-write of the whole file, swapped in by rename.
    fn set_many(&mut self, entries: Vec<(&str, Value)>) -> Result<()> {
        let mut all = self.read_all()?;
        for (key, value) in entries {
            all.insert(key.to_string(), value);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_string_pretty(&Value::Object(all))?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Merges each session's histogram into the persistent one at most once.
pub struct HistogramStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> HistogramStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Stored histogram, or an empty one if nothing was stored yet.
    pub fn load(&self) -> Result<PersistentHistogram> {
        match self.store.get(HISTOGRAM_KEY)? {
            None => Ok(PersistentHistogram::new()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| CalibrationError::InvalidHistogram(e.to_string())),
        }
    }

    pub fn merged_sessions(&self) -> Result<Vec<String>> {
        match self.store.get(MERGED_SESSIONS_KEY)? {
            None => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Merge `session`'s histogram unless `session_id` was merged before.
    ///
    /// Returns whether the stored histogram changed.
    pub fn merge_session(&mut self, session_id: &str, session: &DanHistogram) -> Result<bool> {
        let mut merged = self.merged_sessions()?;
        if merged.iter().any(|id| id == session_id) {
            log::info!("session {} already merged into the histogram, skipping", session_id);
            return Ok(false);
        }

        let mut histogram = self.load()?;
        histogram.merge(session);
        merged.push(session_id.to_string());

        self.store.set_many(vec![
            (HISTOGRAM_KEY, serde_json::to_value(&histogram)?),
            (MERGED_SESSIONS_KEY, serde_json::to_value(&merged)?),
        ])?;
        log::debug!(
            "merged session {} ({} samples); histogram now {} samples over {} sessions",
            session_id,
            session.total_samples,
            histogram.histogram.total_samples,
            histogram.session_count
        );
        Ok(true)
    }
}
