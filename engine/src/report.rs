//! Results of a reconciliation run.

use crate::{Action, SyncStatus, Uid};
use serde::{Deserialize, Serialize};

/// What happened to one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// The strategy chose `ignore`
    Ignored,
    /// Dry run: the action was decided but not executed
    Planned,
    /// The action was executed and metadata advanced
    Applied,
    /// Reported as a conflict, nothing changed
    Conflict,
    /// A store call failed, metadata left untouched
    Failed { reason: String },
}

/// Per-identifier result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub uid: Uid,
    pub action: Action,
    pub status_a: SyncStatus,
    pub status_b: SyncStatus,
    pub disposition: Disposition,
}

/// Result of [`Driver::run_all`](crate::Driver::run_all).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub dry_run: bool,
    /// Outcomes in processing order
    pub outcomes: Vec<Outcome>,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// The action sequence, in processing order.
    pub fn actions(&self) -> Vec<(Uid, Action)> {
        self.outcomes
            .iter()
            .map(|o| (o.uid.clone(), o.action))
            .collect()
    }

    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    pub fn applied(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == Disposition::Applied)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == Disposition::Conflict)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.disposition, Disposition::Failed { .. }))
    }

    /// True when every identifier was left alone.
    pub fn is_converged(&self) -> bool {
        self.outcomes.iter().all(|o| o.action == Action::Ignore)
    }
}
