//! Stabilization journal.
//!
//! Stabilize is a three-step routine (read, delete, re-write) with no
//! transaction around it: a crash or replica failure between the steps
//! leaves the key half-migrated. The journal makes that state durable and
//! visible. A key enters the journal when its migration starts, carrying the
//! ring size it is migrating from, and leaves only when the migration
//! completes. Pending entries are re-attempted on coordinator startup and
//! whenever the key is next read.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::NodeError;

pub struct StabilizeJournal {
    entries: DashMap<String, usize>,
    path: PathBuf,
}

impl StabilizeJournal {
    /// Open (or create) the journal at `dir/stabilize.json`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = dir.as_ref().join("stabilize.json");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                DashMap::new()
            } else {
                let snapshot: BTreeMap<String, usize> =
                    serde_json::from_str(&text).map_err(|e| {
                        NodeError::StoreConflict(format!(
                            "cannot load journal {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                snapshot.into_iter().collect()
            }
        } else {
            DashMap::new()
        };

        Ok(Self { entries, path })
    }

    /// Record that `key` is migrating away from `from_ring_size`.
    pub fn begin(&self, key: &str, from_ring_size: usize) -> Result<(), NodeError> {
        self.entries.insert(key.to_string(), from_ring_size);
        self.persist()
    }

    /// Clear the entry after a successful migration.
    pub fn complete(&self, key: &str) -> Result<(), NodeError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys still in migration, with the ring size they were migrating from.
    pub fn pending(&self) -> Vec<(String, usize)> {
        let mut pending: Vec<(String, usize)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        pending.sort();
        pending
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
        let text = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            NodeError::StoreConflict(format!(
                "cannot serialize journal {}: {}",
                self.path.display(),
                e
            ))
        })?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
