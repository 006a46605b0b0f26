//! Local tables.
//!
//! Every peer owns a record table; the coordinator additionally owns the
//! lookup table mapping each key to the ring size in effect when it was last
//! written. Both tables persist as JSON snapshots in the data directory and
//! are reloaded on open, so a restarted peer keeps its data.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::NodeError;

/// A stored record as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: String,
    /// Wall-clock millis of the last write applied locally. Drives
    /// last-writer-wins reconciliation.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    timestamp: u64,
}

/// Primary-keyed table of `{key, value, timestamp}`.
pub struct RecordTable {
    entries: DashMap<String, StoredValue>,
    path: PathBuf,
}

impl RecordTable {
    /// Open (or create) the table at `dir/records.json`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = dir.as_ref().join("records.json");
        let entries = load_table::<StoredValue>(&path)?;
        Ok(Self { entries, path })
    }

    /// Insert or replace the record for `key`, stamping the current instant.
    ///
    /// Rejects with `StoreConflict` when the existing record carries a
    /// timestamp ahead of the new stamp, which would silently reorder
    /// last-writer-wins.
    pub fn upsert(&self, key: &str, value: &str) -> Result<u64, NodeError> {
        let now = now_millis();

        if let Some(existing) = self.entries.get(key) {
            if existing.timestamp > now {
                return Err(NodeError::StoreConflict(format!(
                    "record for '{}' is stamped {} which is ahead of {}",
                    key, existing.timestamp, now
                )));
            }
        }

        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                timestamp: now,
            },
        );
        self.persist()?;
        Ok(now)
    }

    /// Install a record with an explicit timestamp. Replication repair and
    /// test harnesses use this; the normal write path stamps its own clock.
    pub fn apply(&self, key: &str, value: &str, timestamp: u64) -> Result<(), NodeError> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                timestamp,
            },
        );
        self.persist()
    }

    pub fn get(&self, key: &str) -> Option<Record> {
        self.entries.get(key).map(|entry| Record {
            key: key.to_string(),
            value: entry.value.clone(),
            timestamp: entry.timestamp,
        })
    }

    /// Delete the record for `key`, returning it. Absent keys error with
    /// `KeyNotFound` and leave the table untouched.
    pub fn remove(&self, key: &str) -> Result<Record, NodeError> {
        let (key, stored) = self
            .entries
            .remove(key)
            .ok_or_else(|| NodeError::KeyNotFound(key.to_string()))?;
        self.persist()?;
        Ok(Record {
            key,
            value: stored.value,
            timestamp: stored.timestamp,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), NodeError> {
        let snapshot: BTreeMap<String, StoredValue> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        write_table(&self.path, &snapshot)
    }
}

/// Coordinator-side table of `{key, ring_size}`.
pub struct LookupTable {
    entries: DashMap<String, usize>,
    path: PathBuf,
}

impl LookupTable {
    /// Open (or create) the table at `dir/lookup.json`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = dir.as_ref().join("lookup.json");
        let entries = load_table::<usize>(&path)?;
        Ok(Self { entries, path })
    }

    pub fn upsert(&self, key: &str, ring_size: usize) -> Result<(), NodeError> {
        self.entries.insert(key.to_string(), ring_size);
        self.persist()
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    pub fn remove(&self, key: &str) -> Result<usize, NodeError> {
        let (_, ring_size) = self
            .entries
            .remove(key)
            .ok_or_else(|| NodeError::KeyNotFound(key.to_string()))?;
        self.persist()?;
        Ok(ring_size)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), NodeError> {
        let snapshot: BTreeMap<String, usize> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        write_table(&self.path, &snapshot)
    }
}

fn load_table<V: for<'de> Deserialize<'de>>(
    path: &Path,
) -> Result<DashMap<String, V>, NodeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        return Ok(DashMap::new());
    }

    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(DashMap::new());
    }

    let snapshot: BTreeMap<String, V> = serde_json::from_str(&text).map_err(|e| {
        NodeError::StoreConflict(format!("cannot load table {}: {}", path.display(), e))
    })?;
    Ok(snapshot.into_iter().collect())
}

fn write_table<V: Serialize>(path: &Path, snapshot: &BTreeMap<String, V>) -> Result<(), NodeError> {
    let text = serde_json::to_string_pretty(snapshot).map_err(|e| {
        NodeError::StoreConflict(format!("cannot serialize table {}: {}", path.display(), e))
    })?;
    std::fs::write(path, text)?;
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
