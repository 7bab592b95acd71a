//! Decision strategies.
//!
//! A strategy looks at the sync metadata of both sides of one identifier and
//! picks the single [`Action`] that moves the pair towards convergence.
//! Strategies never touch a store, so the driver may consult them freely
//! (dry runs, logging) without side effects.

use crate::{Error, SyncInfo, SyncStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Corrective action for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do
    Ignore,
    /// Both sides changed incompatibly; left for the user
    Conflict,
    /// Delete the record on side A
    DeleteA,
    /// Delete the record on side B
    DeleteB,
    /// Copy A's record to B, keeping B's if it has unsynced changes
    CopyAToB,
    /// Copy B's record to A, keeping A's if it has unsynced changes
    CopyBToA,
    /// Replace B's record with A's unconditionally
    OverwriteCopyAToB,
    /// Replace A's record with B's unconditionally
    OverwriteCopyBToA,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Ignore,
        Action::Conflict,
        Action::DeleteA,
        Action::DeleteB,
        Action::CopyAToB,
        Action::CopyBToA,
        Action::OverwriteCopyAToB,
        Action::OverwriteCopyBToA,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Ignore => "ignore",
            Action::Conflict => "conflict",
            Action::DeleteA => "delete_a",
            Action::DeleteB => "delete_b",
            Action::CopyAToB => "copy_a_to_b",
            Action::CopyBToA => "copy_b_to_a",
            Action::OverwriteCopyAToB => "overwrite_copy_a_to_b",
            Action::OverwriteCopyBToA => "overwrite_copy_b_to_a",
        }
    }

    /// Whether executing this action writes to a store.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Action::Ignore | Action::Conflict)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pure decision function over two sides' metadata.
///
/// Implementations must be deterministic: the same pair of inputs always
/// yields the same action.
pub trait Strategy {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Choose the action for one identifier.
    fn decide(&self, a: &SyncInfo, b: &SyncInfo) -> Action;
}

/// Symmetric two-way sync. Changes flow in whichever direction they
/// happened; concurrent incompatible changes are reported as conflicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoWay;

impl Strategy for TwoWay {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn decide(&self, a: &SyncInfo, b: &SyncInfo) -> Action {
        use SyncStatus::*;

        match (a.status(), b.status()) {
            (Absent, New | Modified) => Action::CopyBToA,
            (New | Modified, Absent) => Action::CopyAToB,

            // Both sides changed. Identical content needs no copy.
            (New | Modified, New | Modified) => {
                if a.current_fingerprint() == b.current_fingerprint() {
                    Action::Ignore
                } else {
                    Action::Conflict
                }
            }

            (New | Modified, Unmodified) => Action::CopyAToB,
            (Unmodified, New | Modified) => Action::CopyBToA,

            // Changed on one side, deleted on the other.
            (New | Modified, Deleted) | (Deleted, New | Modified) => Action::Conflict,

            (Unmodified, Deleted) => Action::DeleteA,
            (Deleted, Unmodified) => Action::DeleteB,

            (Absent, Absent | Unmodified | Deleted)
            | (Unmodified, Absent | Unmodified)
            | (Deleted, Absent | Deleted) => Action::Ignore,
        }
    }
}

/// One-way mirror: side A is authoritative and B is made identical to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mirror;

impl Strategy for Mirror {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn decide(&self, a: &SyncInfo, b: &SyncInfo) -> Action {
        match (a.status().is_live(), b.status().is_live()) {
            (true, false) => Action::CopyAToB,
            (true, true) if a.current_fingerprint() == b.current_fingerprint() => Action::Ignore,
            (true, true) => Action::OverwriteCopyAToB,
            (false, true) => Action::DeleteB,
            (false, false) => Action::Ignore,
        }
    }
}

/// The registry of strategies, selected by name at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// [`TwoWay`] (default)
    #[default]
    Sync,
    /// [`Mirror`]
    Mirror,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Sync, StrategyKind::Mirror];
}

impl Strategy for StrategyKind {
    fn name(&self) -> &'static str {
        match self {
            StrategyKind::Sync => TwoWay.name(),
            StrategyKind::Mirror => Mirror.name(),
        }
    }

    fn decide(&self, a: &SyncInfo, b: &SyncInfo) -> Action {
        match self {
            StrategyKind::Sync => TwoWay.decide(a, b),
            StrategyKind::Mirror => Mirror.decide(a, b),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownStrategy(wanted.to_string()))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
