//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between an in-memory store and whatever file the
//! caller keeps it in. They serialize deterministically so two snapshots of
//! the same state compare equal byte for byte (apart from `savedAt`).

use crate::{error::Result, Error, Fingerprint, Record, Uid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Persisted state of one identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    /// Live record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    /// Last synchronized fingerprint, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<Fingerprint>,
}

/// A point-in-time snapshot of a store.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Store name
    pub name: String,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Per-identifier state, tombstones included
    pub entries: BTreeMap<Uid, SnapshotEntry>,
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            name: name.into(),
            saved_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Count of live records.
    pub fn record_count(&self) -> usize {
        self.entries.values().filter(|e| e.record.is_some()).count()
    }

    /// Count of identifiers without a live record.
    pub fn tombstone_count(&self) -> usize {
        self.entries.len() - self.record_count()
    }

    /// Check the snapshot is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (expected {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        for (uid, entry) in &self.entries {
            let Some(record) = &entry.record else {
                continue;
            };
            if &record.uid != uid {
                return Err(Error::InvalidSnapshot(format!(
                    "record '{}' stored under key '{}'",
                    record.uid, uid
                )));
            }
            if !record.is_consistent() {
                return Err(Error::InvalidSnapshot(format!(
                    "fingerprint of '{}' does not match its content",
                    uid
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Summary of a snapshot without the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub record_count: usize,
    pub tombstone_count: usize,
}

impl From<&StoreSnapshot> for SnapshotMetadata {
    fn from(snapshot: &StoreSnapshot) -> Self {
        Self {
            format_version: snapshot.format_version,
            name: snapshot.name.clone(),
            saved_at: snapshot.saved_at,
            record_count: snapshot.record_count(),
            tombstone_count: snapshot.tombstone_count(),
        }
    }
}
