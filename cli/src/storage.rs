//! Snapshot files on disk.

use crate::error::{AppError, Result};
use calsync_engine::{MemoryStore, SnapshotMetadata, StoreSnapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Load a store from its snapshot file.
///
/// A missing file is an empty store named after the file stem.
pub fn load_store(path: &Path) -> Result<MemoryStore> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let name = store_name(path);
            tracing::info!("No snapshot at {}, starting empty store '{}'", path.display(), name);
            return Ok(MemoryStore::new(name));
        }
        Err(err) => return Err(AppError::io(path, err)),
    };

    let snapshot = StoreSnapshot::from_json(&contents)?;
    let meta = SnapshotMetadata::from(&snapshot);
    tracing::debug!(
        "Loaded '{}' from {}: {} records, {} tombstones, saved {}",
        meta.name,
        path.display(),
        meta.record_count,
        meta.tombstone_count,
        meta.saved_at
    );

    Ok(MemoryStore::from_snapshot(snapshot)?)
}

/// Save a store to its snapshot file (atomic write via temp file + rename).
pub fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    stage(path, store)?.commit()
}

/// Save both sides of a sync pair.
///
/// Both snapshots are written to temp files before either is renamed into
/// place, so a failed write leaves both files as they were. Side B is
/// renamed first.
pub fn save_pair(
    path_a: &Path,
    store_a: &MemoryStore,
    path_b: &Path,
    store_b: &MemoryStore,
) -> Result<()> {
    let staged_b = stage(path_b, store_b)?;
    let staged_a = match stage(path_a, store_a) {
        Ok(staged) => staged,
        Err(err) => {
            staged_b.discard();
            return Err(err);
        }
    };

    if let Err(err) = staged_b.commit() {
        staged_a.discard();
        return Err(err);
    }
    staged_a.commit()
}

/// A snapshot written next to its destination, not yet renamed into place.
#[derive(Debug)]
struct Staged {
    temp: PathBuf,
    path: PathBuf,
    records: usize,
}

impl Staged {
    fn commit(self) -> Result<()> {
        if let Err(err) = fs::rename(&self.temp, &self.path) {
            let path = self.path.clone();
            self.discard();
            return Err(AppError::io(&path, err));
        }
        tracing::debug!("Saved {} records to {}", self.records, self.path.display());
        Ok(())
    }

    fn discard(self) {
        if let Err(err) = fs::remove_file(&self.temp) {
            tracing::warn!("Could not remove {}: {}", self.temp.display(), err);
        }
    }
}

fn stage(path: &Path, store: &MemoryStore) -> Result<Staged> {
    let contents = store.export_state().to_json_pretty()?;
    let temp = temp_path(path);
    fs::write(&temp, contents).map_err(|e| AppError::io(&temp, e))?;
    Ok(Staged {
        temp,
        path: path.to_path_buf(),
        records: store.len(),
    })
}

fn store_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string())
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}
