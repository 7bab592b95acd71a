//! The reconciliation driver.
//!
//! # Algorithm
//!
//! 1. Take the union of both stores' identifiers, in lexicographic order
//! 2. For each identifier, read both sides' sync metadata
//! 3. Ask the strategy for one action
//! 4. Execute it (unless dry-running) and advance the metadata of the
//!    affected sides
//!
//! Identifiers are independent: a failure on one is reported and the run
//! moves on. Anything left unconverged is picked up again by the next run.

use crate::{
    error::Result, Action, Disposition, Outcome, Strategy, StrategyKind, SyncReport, SyncStore,
    Uid,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reconciles two stores with a strategy.
pub struct Driver<A, B> {
    store_a: A,
    store_b: B,
    strategy: StrategyKind,
    cancel: Option<Arc<AtomicBool>>,
}

impl<A: SyncStore, B: SyncStore> Driver<A, B> {
    /// Create a driver, resolving the strategy by name.
    ///
    /// Fails with [`crate::Error::UnknownStrategy`] before any store is touched.
    pub fn new(store_a: A, store_b: B, strategy_name: &str) -> Result<Self> {
        let strategy = strategy_name.parse()?;
        Ok(Self::with_strategy(store_a, store_b, strategy))
    }

    /// Create a driver with an already resolved strategy.
    pub fn with_strategy(store_a: A, store_b: B, strategy: StrategyKind) -> Self {
        Self {
            store_a,
            store_b,
            strategy,
            cancel: None,
        }
    }

    /// Stop `run_all` before the next identifier once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn store_a(&self) -> &A {
        &self.store_a
    }

    pub fn store_b(&self) -> &B {
        &self.store_b
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Give the stores back.
    pub fn into_stores(self) -> (A, B) {
        (self.store_a, self.store_b)
    }

    /// Union of both stores' identifiers, each once, in lexicographic order.
    pub fn identifiers(&self) -> BTreeSet<Uid> {
        let mut uids = self.store_a.identifiers();
        uids.extend(self.store_b.identifiers());
        uids
    }

    /// Reconcile every known identifier.
    pub fn run_all(&mut self, dry_run: bool) -> SyncReport {
        let uids = self.identifiers();
        let total = uids.len();
        let mut report = SyncReport::new(dry_run);

        info!(
            "Reconciling {} identifiers between '{}' and '{}' using '{}'{}",
            total,
            self.store_a.name(),
            self.store_b.name(),
            self.strategy,
            if dry_run { " (dry run)" } else { "" }
        );

        for uid in &uids {
            if self.is_cancelled() {
                warn!(
                    "Sync cancelled after {} of {} identifiers",
                    report.outcomes.len(),
                    total
                );
                report.cancelled = true;
                break;
            }
            report.outcomes.push(self.reconcile_one(uid, dry_run, false));
        }

        info!(
            "Sync finished: {} processed, {} applied, {} conflicts, {} failed",
            report.outcomes.len(),
            report.applied().count(),
            report.conflicts().count(),
            report.failures().count()
        );

        report
    }

    /// Reconcile a single identifier.
    ///
    /// With `dry_run` the action is decided and reported but not executed.
    /// `quiet` suppresses the `ABOUT` line.
    pub fn reconcile_one(&mut self, uid: &str, dry_run: bool, quiet: bool) -> Outcome {
        let info_a = self.store_a.metadata(uid);
        let info_b = self.store_b.metadata(uid);
        let action = self.strategy.decide(&info_a, &info_b);

        let mut outcome = Outcome {
            uid: uid.to_string(),
            action,
            status_a: info_a.status(),
            status_b: info_b.status(),
            disposition: Disposition::Ignored,
        };

        if action == Action::Ignore {
            debug!("{} => ignore ({} vs {})", uid, outcome.status_a, outcome.status_b);
            return outcome;
        }

        if !quiet {
            info!(
                "ABOUT{} {} => {} ({} vs {})",
                if dry_run { "(DRY_RUN)" } else { "" },
                uid,
                action,
                outcome.status_a,
                outcome.status_b
            );
        }

        if dry_run {
            outcome.disposition = Disposition::Planned;
            return outcome;
        }

        outcome.disposition = match self.execute(uid, action) {
            Ok(disposition) => disposition,
            Err(err) => Disposition::Failed {
                reason: err.to_string(),
            },
        };
        outcome
    }

    fn execute(&mut self, uid: &str, action: Action) -> Result<Disposition> {
        match action {
            Action::Ignore => return Ok(Disposition::Ignored),
            Action::Conflict => {
                warn!(
                    "Conflict: UID={}, Summary={} / {} ... did nothing.",
                    uid,
                    summary_of(&self.store_a, uid),
                    summary_of(&self.store_b, uid)
                );
                return Ok(Disposition::Conflict);
            }
            Action::DeleteA => delete(uid, &mut self.store_a, &mut self.store_b)?,
            Action::DeleteB => delete(uid, &mut self.store_b, &mut self.store_a)?,
            Action::CopyAToB => copy(uid, &mut self.store_a, &mut self.store_b, false)?,
            Action::CopyBToA => copy(uid, &mut self.store_b, &mut self.store_a, false)?,
            Action::OverwriteCopyAToB => copy(uid, &mut self.store_a, &mut self.store_b, true)?,
            Action::OverwriteCopyBToA => copy(uid, &mut self.store_b, &mut self.store_a, true)?,
        }
        Ok(Disposition::Applied)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn summary_of(store: &dyn SyncStore, uid: &str) -> String {
    store
        .get(uid)
        .map(|r| r.summary)
        .unwrap_or_else(|_| "(deleted)".to_string())
}

/// Delete `uid` from `target` and record both sides as synced-absent.
///
/// A `mark_synced` failure is reported after the record is already gone;
/// the next run sees the side as deleted and finishes the job.
fn delete(uid: &str, target: &mut dyn SyncStore, other: &mut dyn SyncStore) -> Result<()> {
    let result = target
        .delete(uid)
        .and_then(|()| target.mark_synced(uid, None))
        .and_then(|()| other.mark_synced(uid, None));
    if let Err(err) = &result {
        warn!(error = %err, "DELETE: failed.");
    }
    result
}

/// Copy `uid` from `src` to `dst` and advance both checkpoints.
fn copy(uid: &str, src: &mut dyn SyncStore, dst: &mut dyn SyncStore, overwrite: bool) -> Result<()> {
    let result = transfer(uid, src, dst, overwrite);
    if let Err(err) = &result {
        warn!(error = %err, "COPY: failed.");
    }
    result
}

fn transfer(
    uid: &str,
    src: &mut dyn SyncStore,
    dst: &mut dyn SyncStore,
    overwrite: bool,
) -> Result<()> {
    let record = src.get(uid)?;
    info!(
        "COPYING:{} {}",
        if overwrite { " (overwrite)" } else { "" },
        record.uid
    );

    if overwrite {
        dst.delete(uid)?;
    }
    let written = dst.put(&record, overwrite)?;

    src.mark_synced(uid, Some(record.fingerprint.clone()))?;
    dst.mark_synced(uid, written.current_fingerprint().cloned())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, MemoryStore, Record, SyncStatus};
    use serde_json::json;

    fn event(uid: &str, summary: &str) -> Record {
        Record::new(uid, summary, json!({"start": "2026-03-01T09:00:00Z"}))
    }

    /// A store pair where `uid` was synced as `summary` on both sides.
    fn synced_pair(uid: &str, summary: &str) -> (MemoryStore, MemoryStore) {
        let record = event(uid, summary);
        let mut a = MemoryStore::new("a");
        let mut b = MemoryStore::new("b");
        for store in [&mut a, &mut b] {
            store.insert(record.clone());
            store
                .mark_synced(uid, Some(record.fingerprint.clone()))
                .unwrap();
        }
        (a, b)
    }

    #[test]
    fn unknown_strategy_fails_at_construction() {
        let result = Driver::new(MemoryStore::new("a"), MemoryStore::new("b"), "newest");
        assert!(matches!(result, Err(Error::UnknownStrategy(name)) if name == "newest"));
    }

    #[test]
    fn identifier_universe_is_deduplicated_union() {
        let mut a = MemoryStore::new("a");
        let mut b = MemoryStore::new("b");
        a.insert(event("a", "A"));
        a.insert(event("c", "C"));
        b.insert(event("b", "B"));
        b.insert(event("a", "A"));

        let driver = Driver::new(a, b, "sync").unwrap();
        let uids: Vec<_> = driver.identifiers().into_iter().collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
    }

    #[test]
    fn run_all_visits_each_identifier_once_in_order() {
        let mut a = MemoryStore::new("a");
        let mut b = MemoryStore::new("b");
        a.insert(event("c", "C"));
        a.insert(event("a", "A"));
        b.insert(event("b", "B"));
        b.insert(event("a", "A"));

        let mut driver = Driver::new(a, b, "sync").unwrap();
        let report = driver.run_all(false);

        let uids: Vec<_> = report.outcomes.iter().map(|o| o.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
        // Same content created on both sides needs nothing.
        assert_eq!(report.outcomes[0].action, Action::Ignore);
        assert_eq!(report.outcomes[1].action, Action::CopyBToA);
        assert_eq!(report.outcomes[2].action, Action::CopyAToB);
    }

    #[test]
    fn copy_marks_both_sides_synced() {
        let mut a = MemoryStore::new("a");
        a.insert(event("u1", "Dentist"));

        let mut driver = Driver::new(a, MemoryStore::new("b"), "sync").unwrap();
        let outcome = driver.reconcile_one("u1", false, false);

        assert_eq!(outcome.action, Action::CopyAToB);
        assert_eq!(outcome.disposition, Disposition::Applied);
        assert_eq!(
            driver.store_a().metadata("u1").status(),
            SyncStatus::Unmodified
        );
        assert_eq!(
            driver.store_b().metadata("u1").status(),
            SyncStatus::Unmodified
        );
        assert!(driver
            .store_b()
            .record("u1")
            .unwrap()
            .same_content(driver.store_a().record("u1").unwrap()));
    }

    #[test]
    fn modification_propagates_over_synced_copy() {
        let (mut a, b) = synced_pair("u1", "Dentist");
        a.insert(Record::new("u1", "Dentist", json!({"start": "10:30"})));

        let mut driver = Driver::new(a, b, "sync").unwrap();
        let outcome = driver.reconcile_one("u1", false, true);

        assert_eq!(outcome.action, Action::CopyAToB);
        assert_eq!(outcome.disposition, Disposition::Applied);
        assert_eq!(
            driver.store_b().record("u1").unwrap().payload,
            json!({"start": "10:30"})
        );
        assert!(driver.run_all(false).is_converged());
    }

    #[test]
    fn delete_propagates_and_clears_checkpoints() {
        let (a, mut b) = synced_pair("u2", "Lunch");
        b.remove("u2");

        let mut driver = Driver::new(a, b, "sync").unwrap();
        let outcome = driver.reconcile_one("u2", false, false);

        assert_eq!(outcome.action, Action::DeleteA);
        assert_eq!(outcome.disposition, Disposition::Applied);
        for info in [
            driver.store_a().metadata("u2"),
            driver.store_b().metadata("u2"),
        ] {
            assert_eq!(info.last_synced_fingerprint(), None);
            assert_eq!(info.status(), SyncStatus::Absent);
        }
        assert!(driver.store_a().is_empty());
    }

    #[test]
    fn conflict_changes_nothing() {
        let (mut a, mut b) = synced_pair("u3", "Review");
        a.insert(event("u3", "Review (moved)"));
        b.insert(event("u3", "Review (cancelled?)"));
        let (before_a, before_b) = (a.clone(), b.clone());

        let mut driver = Driver::new(a, b, "sync").unwrap();
        let first = driver.run_all(false);
        let second = driver.run_all(false);

        assert_eq!(first.outcomes[0].disposition, Disposition::Conflict);
        assert_eq!(second.outcomes[0].disposition, Disposition::Conflict);
        let (after_a, after_b) = driver.into_stores();
        assert_eq!(after_a, before_a);
        assert_eq!(after_b, before_b);
    }

    #[test]
    fn ignore_leaves_stores_untouched() {
        let (a, b) = synced_pair("u4", "Gym");
        let (before_a, before_b) = (a.clone(), b.clone());

        let mut driver = Driver::new(a, b, "sync").unwrap();
        let outcome = driver.reconcile_one("u4", false, false);

        assert_eq!(outcome.action, Action::Ignore);
        assert_eq!(outcome.disposition, Disposition::Ignored);
        assert_eq!(driver.store_a(), &before_a);
        assert_eq!(driver.store_b(), &before_b);
    }

    #[test]
    fn mirror_overwrites_modified_destination() {
        let (a, mut b) = synced_pair("u5", "Offsite");
        b.insert(event("u5", "Offsite (edited on phone)"));

        let mut driver = Driver::new(a, b, "mirror").unwrap();
        let report = driver.run_all(false);

        assert_eq!(
            report.actions(),
            vec![("u5".to_string(), Action::OverwriteCopyAToB)]
        );
        assert_eq!(driver.store_b().record("u5").unwrap().summary, "Offsite");
        assert!(driver.run_all(false).is_converged());
    }

    #[test]
    fn dry_run_plans_without_executing() {
        let mut a = MemoryStore::new("a");
        a.insert(event("u1", "Dentist"));
        let (before_a, before_b) = (a.clone(), MemoryStore::new("b"));

        let mut driver = Driver::new(a, MemoryStore::new("b"), "sync").unwrap();
        let report = driver.run_all(true);

        assert!(report.dry_run);
        assert_eq!(report.outcomes[0].disposition, Disposition::Planned);
        assert_eq!(driver.store_a(), &before_a);
        assert_eq!(driver.store_b(), &before_b);
    }

    #[test]
    fn cancel_flag_stops_between_identifiers() {
        let mut a = MemoryStore::new("a");
        a.insert(event("u1", "One"));
        a.insert(event("u2", "Two"));
        let flag = Arc::new(AtomicBool::new(true));

        let mut driver = Driver::new(a, MemoryStore::new("b"), "sync")
            .unwrap()
            .with_cancel_flag(flag.clone());
        let report = driver.run_all(false);

        assert!(report.cancelled);
        assert!(report.outcomes.is_empty());
        assert!(driver.store_b().is_empty());

        flag.store(false, Ordering::SeqCst);
        let report = driver.run_all(false);
        assert!(!report.cancelled);
        assert_eq!(report.count(Action::CopyAToB), 2);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use proptest::strategy::Strategy;

        const CONTENTS: [&str; 3] = ["e0", "e1", "e2"];

        /// (live content, last synced content) for one side of one uid.
        fn arb_side() -> impl Strategy<Value = (Option<usize>, Option<usize>)> {
            (
                proptest::option::of(0..CONTENTS.len()),
                proptest::option::of(0..CONTENTS.len()),
            )
        }

        fn build(name: &str, sides: &[(Option<usize>, Option<usize>)]) -> MemoryStore {
            let mut store = MemoryStore::new(name);
            for (i, (current, last)) in sides.iter().enumerate() {
                let uid = format!("uid-{}", i);
                if let Some(c) = current {
                    store.insert(event(&uid, CONTENTS[*c]));
                }
                if let Some(l) = last {
                    let fp = event(&uid, CONTENTS[*l]).fingerprint;
                    store.mark_synced(&uid, Some(fp)).unwrap();
                }
            }
            store
        }

        fn arb_pair() -> impl Strategy<Value = (MemoryStore, MemoryStore)> {
            proptest::collection::vec((arb_side(), arb_side()), 1..8).prop_map(|sides| {
                let a: Vec<_> = sides.iter().map(|(a, _)| *a).collect();
                let b: Vec<_> = sides.iter().map(|(_, b)| *b).collect();
                (build("a", &a), build("b", &b))
            })
        }

        fn arb_kind() -> impl Strategy<Value = StrategyKind> {
            prop_oneof![Just(StrategyKind::Sync), Just(StrategyKind::Mirror)]
        }

        proptest! {
            #[test]
            fn prop_second_run_only_ignores_or_conflicts(
                kind in arb_kind(),
                (a, b) in arb_pair(),
            ) {
                let mut driver = Driver::with_strategy(a, b, kind);
                let first = driver.run_all(false);
                let second = driver.run_all(false);

                prop_assert_eq!(second.failures().count(), 0);
                for outcome in &second.outcomes {
                    prop_assert!(
                        matches!(outcome.action, Action::Ignore | Action::Conflict),
                        "{} still needs {}",
                        outcome.uid,
                        outcome.action
                    );
                }

                // Conflicts are terminal: the same ones come back.
                let conflicts = |r: &SyncReport| -> Vec<Uid> {
                    r.conflicts().map(|o| o.uid.clone()).collect()
                };
                prop_assert_eq!(conflicts(&first), conflicts(&second));
            }

            #[test]
            fn prop_dry_run_matches_live_run(
                kind in arb_kind(),
                (a, b) in arb_pair(),
            ) {
                let mut dry = Driver::with_strategy(a.clone(), b.clone(), kind);
                let planned = dry.run_all(true);
                let (dry_a, dry_b) = dry.into_stores();
                prop_assert_eq!(&dry_a, &a);
                prop_assert_eq!(&dry_b, &b);

                let mut live = Driver::with_strategy(a, b, kind);
                let executed = live.run_all(false);
                prop_assert_eq!(planned.actions(), executed.actions());
            }

            #[test]
            fn prop_mirror_makes_b_equal_a(
                (a, b) in arb_pair(),
            ) {
                let mut driver = Driver::with_strategy(a, b, StrategyKind::Mirror);
                driver.run_all(false);

                let live_a: Vec<_> = driver.store_a().records().cloned().collect();
                let live_b: Vec<_> = driver.store_b().records().cloned().collect();
                prop_assert_eq!(live_a, live_b);
            }
        }
    }
}
