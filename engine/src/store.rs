//! Store contract and the in-memory store.
//!
//! A store holds the live records of one calendar plus one [`SyncInfo`] per
//! identifier it has ever known. Deleted records leave their metadata behind
//! as a tombstone so the other side can learn about the deletion.

use crate::{
    error::Result, snapshot::SnapshotEntry, Error, Fingerprint, Record, StoreSnapshot, SyncInfo,
    Uid,
};
use std::collections::{BTreeMap, BTreeSet};

/// Operations the driver needs from one side of a sync pair.
pub trait SyncStore {
    /// Label used in diagnostics.
    fn name(&self) -> &str;

    /// Every identifier this store holds or once held, tombstones included.
    fn identifiers(&self) -> BTreeSet<Uid>;

    /// Sync metadata for `uid`. Unknown identifiers report as absent.
    fn metadata(&self, uid: &str) -> SyncInfo;

    /// Fetch the live record for `uid`.
    fn get(&self, uid: &str) -> Result<Record>;

    /// Write a record.
    ///
    /// Without `overwrite`, fails with [`Error::RecordAlreadyExists`] and leaves
    /// the store untouched if the live record has changes that were never
    /// synced. A live record still at its last-synced version is replaced.
    /// The returned metadata carries the fingerprint the store assigned, which
    /// may differ from the source's.
    fn put(&mut self, record: &Record, overwrite: bool) -> Result<SyncInfo>;

    /// Remove the live record for `uid`. Already absent counts as success.
    fn delete(&mut self, uid: &str) -> Result<()>;

    /// Record `fingerprint` as the last synchronized state of `uid`.
    fn mark_synced(&mut self, uid: &str, fingerprint: Option<Fingerprint>) -> Result<()>;
}

/// State kept for one identifier.
#[derive(Debug, Clone, Default, PartialEq)]
struct Entry {
    record: Option<Record>,
    last_synced: Option<Fingerprint>,
}

impl Entry {
    fn info(&self) -> SyncInfo {
        SyncInfo::new(
            self.record.as_ref().map(|r| r.fingerprint.clone()),
            self.last_synced.clone(),
        )
    }

    fn is_live(&self) -> bool {
        self.record.is_some()
    }
}

/// An in-memory calendar store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    name: String,
    entries: BTreeMap<Uid, Entry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build a store from a validated snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut store = Self::new(snapshot.name.clone());
        store.import_state(snapshot)?;
        Ok(store)
    }

    /// Create or modify a record, as a user editing this calendar would.
    ///
    /// The fingerprint is recomputed from the content.
    pub fn insert(&mut self, mut record: Record) -> SyncInfo {
        record.fingerprint = record.content_fingerprint();
        let entry = self.entries.entry(record.uid.clone()).or_default();
        entry.record = Some(record);
        entry.info()
    }

    /// Delete a record locally, keeping its metadata as a tombstone.
    pub fn remove(&mut self, uid: &str) -> Option<Record> {
        self.entries.get_mut(uid).and_then(|e| e.record.take())
    }

    /// Get a live record.
    pub fn record(&self, uid: &str) -> Option<&Record> {
        self.entries.get(uid).and_then(|e| e.record.as_ref())
    }

    /// All live records in identifier order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.entries.values().filter_map(|e| e.record.as_ref())
    }

    /// Count of live records.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_live()).count()
    }

    /// Check if the store has no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of identifiers with metadata, tombstones included.
    pub fn known_count(&self) -> usize {
        self.entries.len()
    }

    /// Export the current state as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new(self.name.clone());
        for (uid, entry) in &self.entries {
            snapshot.entries.insert(
                uid.clone(),
                SnapshotEntry {
                    record: entry.record.clone(),
                    last_synced: entry.last_synced.clone(),
                },
            );
        }
        snapshot
    }

    /// Replace the current state with a snapshot's state.
    pub fn import_state(&mut self, snapshot: StoreSnapshot) -> Result<()> {
        snapshot.validate()?;

        self.name = snapshot.name;
        self.entries = snapshot
            .entries
            .into_iter()
            .map(|(uid, e)| {
                (
                    uid,
                    Entry {
                        record: e.record,
                        last_synced: e.last_synced,
                    },
                )
            })
            .collect();

        Ok(())
    }
}

impl SyncStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn identifiers(&self) -> BTreeSet<Uid> {
        self.entries.keys().cloned().collect()
    }

    fn metadata(&self, uid: &str) -> SyncInfo {
        self.entries
            .get(uid)
            .map(Entry::info)
            .unwrap_or_else(SyncInfo::absent)
    }

    fn get(&self, uid: &str) -> Result<Record> {
        self.record(uid)
            .cloned()
            .ok_or_else(|| Error::RecordNotFound(uid.to_string()))
    }

    fn put(&mut self, record: &Record, overwrite: bool) -> Result<SyncInfo> {
        if !overwrite && self.metadata(&record.uid).status().is_changed() {
            return Err(Error::RecordAlreadyExists(record.uid.clone()));
        }
        Ok(self.insert(record.clone()))
    }

    fn delete(&mut self, uid: &str) -> Result<()> {
        self.remove(uid);
        Ok(())
    }

    fn mark_synced(&mut self, uid: &str, fingerprint: Option<Fingerprint>) -> Result<()> {
        self.entries.entry(uid.to_string()).or_default().last_synced = fingerprint;
        Ok(())
    }
}
