//! Record and sync metadata types.

use crate::{error::Result, Error, Uid};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

const FINGERPRINT_PREFIX: &str = "blake3:";

/// Content fingerprint of one version of a record.
///
/// Always `blake3:` followed by 64 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the content of a record.
    ///
    /// `serde_json::Value` objects keep their keys sorted, so equal content
    /// always encodes to the same bytes.
    pub fn of(summary: &str, payload: &serde_json::Value) -> Self {
        let canonical = json!({ "summary": summary, "payload": payload }).to_string();
        Self(format!(
            "{}{}",
            FINGERPRINT_PREFIX,
            blake3::hash(canonical.as_bytes()).to_hex()
        ))
    }

    /// Parse and validate a fingerprint string.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let Some(hex) = s.strip_prefix(FINGERPRINT_PREFIX) else {
            return Err(Error::InvalidFingerprint(format!(
                "'{}' must start with {}",
                s, FINGERPRINT_PREFIX
            )));
        };
        if hex.len() != 64 || !hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(Error::InvalidFingerprint(format!(
                "'{}' is not a lowercase hex digest",
                s
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Fingerprint::parse(value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// A calendar record as held by one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Identifier shared by both stores
    pub uid: Uid,
    /// Human-readable summary, used in diagnostics
    pub summary: String,
    /// Event content, opaque to the engine
    pub payload: serde_json::Value,
    /// Fingerprint of `summary` and `payload`
    pub fingerprint: Fingerprint,
}

impl Record {
    /// Create a record, fingerprinting its content.
    pub fn new(uid: impl Into<Uid>, summary: impl Into<String>, payload: serde_json::Value) -> Self {
        let summary = summary.into();
        let fingerprint = Fingerprint::of(&summary, &payload);
        Self {
            uid: uid.into(),
            summary,
            payload,
            fingerprint,
        }
    }

    /// Recompute the fingerprint from the current content.
    pub fn content_fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.summary, &self.payload)
    }

    /// Check that the stored fingerprint matches the content.
    pub fn is_consistent(&self) -> bool {
        self.fingerprint == self.content_fingerprint()
    }

    /// Check whether two records carry the same content.
    pub fn same_content(&self, other: &Record) -> bool {
        self.summary == other.summary && self.payload == other.payload
    }
}

/// Classification of one side's sync metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Never seen and never synced
    Absent,
    /// Present, never synced
    New,
    /// Present and unchanged since the last sync
    Unmodified,
    /// Present and changed since the last sync
    Modified,
    /// Gone since the last sync
    Deleted,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 5] = [
        SyncStatus::Absent,
        SyncStatus::New,
        SyncStatus::Unmodified,
        SyncStatus::Modified,
        SyncStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Absent => "absent",
            SyncStatus::New => "new",
            SyncStatus::Unmodified => "unmodified",
            SyncStatus::Modified => "modified",
            SyncStatus::Deleted => "deleted",
        }
    }

    /// New or modified since the last sync.
    pub fn is_changed(&self) -> bool {
        matches!(self, SyncStatus::New | SyncStatus::Modified)
    }

    /// A live record exists on this side.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SyncStatus::New | SyncStatus::Unmodified | SyncStatus::Modified
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-store, per-identifier sync metadata.
///
/// A value snapshot: stores hand these out from `metadata()` and advance the
/// checkpoint through `SyncStore::mark_synced`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    current: Option<Fingerprint>,
    last_synced: Option<Fingerprint>,
}

impl SyncInfo {
    pub fn new(current: Option<Fingerprint>, last_synced: Option<Fingerprint>) -> Self {
        Self {
            current,
            last_synced,
        }
    }

    /// Metadata for an identifier a store has never seen.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn current_fingerprint(&self) -> Option<&Fingerprint> {
        self.current.as_ref()
    }

    pub fn last_synced_fingerprint(&self) -> Option<&Fingerprint> {
        self.last_synced.as_ref()
    }

    /// Advance the known-good checkpoint. `None` records "known to be absent".
    pub fn mark_synced(&mut self, fingerprint: Option<Fingerprint>) {
        self.last_synced = fingerprint;
    }

    pub fn status(&self) -> SyncStatus {
        match (&self.current, &self.last_synced) {
            (None, None) => SyncStatus::Absent,
            (Some(_), None) => SyncStatus::New,
            (Some(current), Some(last)) if current == last => SyncStatus::Unmodified,
            (Some(_), Some(_)) => SyncStatus::Modified,
            (None, Some(_)) => SyncStatus::Deleted,
        }
    }
}
