//! Persistence sinks for assembled samples.
//!
//! The importer hands every [`Sample`] to a [`SampleSink`] and keeps the
//! returned [`RecordHandle`]. Two sinks ship with the crate:
//!
//! - [`MemorySink`] - Keeps records in memory (tests, dry runs)
//! - [`RecordStore`] - One JSON file per record in a directory

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{SinkError, SinkResult};
use crate::logs::log_warning;
use crate::models::Sample;

/// Directory where records are stored (relative to current dir)
const DEFAULT_STORE_DIR: &str = ".trail-import/records";

/// Identifier of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHandle(pub Uuid);

impl RecordHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives assembled samples, one call per record.
pub trait SampleSink {
    /// Persist one sample and return its handle.
    fn load_sample(&mut self, sample: &Sample) -> SinkResult<RecordHandle>;

    /// Whether a sample with this name was already persisted.
    fn contains(&self, _name: &str) -> bool {
        false
    }
}

// =============================================================================
// In-memory sink
// =============================================================================

/// Keeps every sample it receives, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<(RecordHandle, Sample)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Last record stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Sample> {
        self.records
            .iter()
            .rev()
            .find(|(_, s)| s.name == name)
            .map(|(_, s)| s)
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.records.iter().map(|(_, s)| s)
    }
}

impl SampleSink for MemorySink {
    fn load_sample(&mut self, sample: &Sample) -> SinkResult<RecordHandle> {
        let handle = RecordHandle::new();
        self.records.push((handle, sample.clone()));
        Ok(handle)
    }

    fn contains(&self, name: &str) -> bool {
        self.records.iter().any(|(_, s)| s.name == name)
    }
}

// =============================================================================
// On-disk record store
// =============================================================================

/// A stored sample with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Unique identifier
    pub id: RecordHandle,
    /// Sample name, for lookups
    pub name: String,
    /// Creation timestamp
    pub created_at: String,
    /// The sample itself
    pub sample: Sample,
}

/// Store keeping one `<id>.json` file per sample
pub struct RecordStore {
    /// Directory where records are stored
    store_dir: PathBuf,
    /// Loaded records (name -> record); a re-imported name replaces the old one
    records: HashMap<String, StoredRecord>,
}

impl RecordStore {
    /// Open the default store, loading existing records from disk
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_STORE_DIR)
    }

    /// Open a store in a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            store_dir: PathBuf::from(dir.as_ref()),
            records: HashMap::new(),
        };
        store.load_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.store_dir
    }

    /// Load all records from the store directory
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.store_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(record) = serde_json::from_str::<StoredRecord>(&content) {
                        self.insert(record);
                    }
                }
            }
        }
    }

    fn insert(&mut self, record: StoredRecord) {
        // Keep the newest record per name
        match self.records.get(&record.name) {
            Some(existing) if existing.created_at > record.created_at => {}
            _ => {
                self.records.insert(record.name.clone(), record);
            }
        }
    }

    /// All stored records
    pub fn list(&self) -> Vec<&StoredRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Get a record by sample name
    pub fn get(&self, name: &str) -> Option<&StoredRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_path(&self, id: &RecordHandle) -> PathBuf {
        self.store_dir.join(format!("{}.json", id))
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSink for RecordStore {
    fn load_sample(&mut self, sample: &Sample) -> SinkResult<RecordHandle> {
        if sample.name.trim().is_empty() {
            return Err(SinkError::Rejected("sample has no name".to_string()));
        }

        // Ensure directory exists
        fs::create_dir_all(&self.store_dir)?;

        let record = StoredRecord {
            id: RecordHandle::new(),
            name: sample.name.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            sample: sample.clone(),
        };

        let content = serde_json::to_string_pretty(&record)?;
        fs::write(self.record_path(&record.id), content)?;

        // Drop the file of the record this one replaces
        if let Some(old) = self.records.remove(&record.name) {
            let stale = self.record_path(&old.id);
            if let Err(e) = fs::remove_file(&stale) {
                log_warning(format!(
                    "Could not remove replaced record {}: {}",
                    stale.display(),
                    e
                ));
            }
        }

        let id = record.id;
        self.records.insert(record.name.clone(), record);
        Ok(id)
    }

    fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }
}
