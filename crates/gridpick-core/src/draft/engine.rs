// Draft engine: the operations callers use to run a weekly snake draft.
//
// Every accepted pick is one atomic unit under the week's exclusive lock:
// re-read state, validate, append the pick, advance the pointer. When that
// unit completes the draft, consolidation runs after the commit.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::availability;
use super::consolidate::{self, ConsolidationReport};
use super::instance::{DraftInstance, DraftStatus};
use super::pick::{DraftPick, RosterRecord};
use super::turn;
use super::validate::validate_pick;
use crate::error::DraftError;
use crate::store::DraftStore;

/// Read-only view of a week's draft for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftSnapshot {
    pub period: u32,
    pub order: Vec<String>,
    pub current_round: u32,
    pub current_index: usize,
    pub rounds_total: u32,
    /// `None` once the draft is complete.
    pub on_the_clock: Option<String>,
    /// Who acts in the current round, in pick order. Empty once complete.
    pub round_order: Vec<String>,
    pub status: DraftStatus,
    /// Unclaimed drivers, ordered by surname.
    pub available: Vec<String>,
    pub picks_made: usize,
}

/// Result of an accepted pick.
#[derive(Debug, Clone, Serialize)]
pub struct PickReceipt {
    pub pick: DraftPick,
    /// The instance after the pointer advanced.
    pub instance: DraftInstance,
    /// Present only when this pick completed the draft.
    pub consolidation: Option<ConsolidationReport>,
}

impl PickReceipt {
    pub fn completed_draft(&self) -> bool {
        self.instance.is_complete()
    }
}

/// Runs snake drafts on top of a [`DraftStore`].
pub struct DraftEngine<S> {
    store: S,
    required: Vec<String>,
}

impl<S: DraftStore> DraftEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            required: Vec::new(),
        }
    }

    /// Participants every new draft order must include.
    pub fn with_required_participants(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create (or reset) the draft for `period`.
    ///
    /// Any previous draft, picks and rosters for the week are discarded.
    pub fn start_draft(
        &self,
        period: u32,
        order: &[String],
        rounds_total: u32,
    ) -> Result<DraftInstance, DraftError> {
        let instance = DraftInstance::new(period, order, rounds_total, &self.required)?;

        let catalog_size = self.store.item_catalog(period)?.len();
        if catalog_size < instance.total_picks() {
            warn!(
                "Week {} needs {} drivers but the catalog holds {}; the draft cannot finish without custom drivers",
                period,
                instance.total_picks(),
                catalog_size
            );
        }

        self.store.create_instance(&instance)?;
        info!(
            "Started draft for week {}: {} participants, {} rounds, order [{}]",
            period,
            instance.order.len(),
            rounds_total,
            instance.order.join(", ")
        );
        Ok(instance)
    }

    /// Snapshot of the week's draft.
    ///
    /// For a complete draft whose rosters are not all recorded yet (for
    /// example after a failed write), consolidation is retried first.
    pub fn get_state(&self, period: u32) -> Result<DraftSnapshot, DraftError> {
        let view = self
            .store
            .read_snapshot(period)?
            .ok_or(DraftError::DraftNotFound { period })?;

        let instance = &view.instance;
        if instance.is_complete() {
            self.retry_missing_rosters(instance, &view.picks);
        }

        let round_order = if instance.is_complete() {
            Vec::new()
        } else {
            turn::round_sequence(&instance.order, instance.current_round)
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        Ok(DraftSnapshot {
            period,
            order: instance.order.clone(),
            current_round: instance.current_round,
            current_index: instance.current_index,
            rounds_total: instance.rounds_total,
            on_the_clock: instance.on_the_clock().map(str::to_string),
            round_order,
            status: instance.status,
            available: availability::available(&view.catalog, &view.picks),
            picks_made: view.picks.len(),
        })
    }

    /// Submit `participant`'s pick of `item` for `period`.
    ///
    /// Validation, the pick write and the pointer advance happen under the
    /// week's exclusive lock, so two racing submissions for one turn can
    /// never both be recorded. Rejections are returned as
    /// `DraftComplete`, `NotYourTurn` or `ItemUnavailable`.
    pub fn submit_pick(
        &self,
        period: u32,
        participant: &str,
        item: &str,
    ) -> Result<PickReceipt, DraftError> {
        let participant = participant.trim();
        let item = item.trim();

        let result = self.store.with_exclusive_instance_lock(period, |draft| {
            let mut instance = draft.instance().clone();
            let catalog = draft.catalog()?;
            let picks = draft.picks()?;

            validate_pick(&instance, participant, item, &catalog, &picks)?;

            let pick = draft.append_pick(instance.current_round, participant, item)?;
            instance.advance();
            draft.save_instance(&instance)?;
            Ok((pick, instance))
        });

        let (pick, instance) = match result {
            Ok(accepted) => accepted,
            Err(e) => {
                if e.is_rejection() {
                    debug!(
                        "Week {}: rejected {} picking {}: {}",
                        period, participant, item, e
                    );
                }
                return Err(e);
            }
        };

        info!(
            "Week {} round {}: {} picked {} ({}/{})",
            period,
            pick.round,
            participant,
            item,
            instance.picks_made(),
            instance.total_picks()
        );

        let consolidation = if instance.is_complete() {
            info!(
                "Draft for week {} complete after {} picks",
                period,
                instance.total_picks()
            );
            match self.consolidate(period) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(
                        "Consolidation for week {} failed, will retry on next state query: {}",
                        period, e
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(PickReceipt {
            pick,
            instance,
            consolidation,
        })
    }

    /// Re-run consolidation when fewer rosters are recorded than the week's
    /// picks call for. Never fails the caller; problems are logged.
    fn retry_missing_rosters(&self, instance: &DraftInstance, picks: &[DraftPick]) {
        let period = instance.period;
        let expected = consolidate::plan(period, picks, instance.rounds_total)
            .rosters
            .len();
        let recorded = match self.store.roster_records(period) {
            Ok(rosters) => rosters.len(),
            Err(e) => {
                warn!("Week {}: could not count recorded rosters: {:#}", period, e);
                return;
            }
        };
        if recorded >= expected {
            return;
        }

        debug!(
            "Week {} complete with {}/{} rosters recorded; consolidating",
            period, recorded, expected
        );
        if let Err(e) = self.consolidate(period) {
            warn!("Consolidation retry for week {} failed: {}", period, e);
        }
    }

    /// Record a roster for every participant whose picks fill all rounds.
    ///
    /// Safe to call repeatedly: existing rosters are left alone. A failed
    /// write for one participant does not stop the others. Does nothing for
    /// a draft that is still active.
    pub fn consolidate(&self, period: u32) -> Result<ConsolidationReport, DraftError> {
        let instance = self
            .store
            .load_instance(period)?
            .ok_or(DraftError::DraftNotFound { period })?;

        let mut report = ConsolidationReport {
            period,
            ..Default::default()
        };
        if !instance.is_complete() {
            debug!("Week {} still active; nothing to consolidate", period);
            return Ok(report);
        }

        let picks = self.store.list_picks(period)?;
        let plan = consolidate::plan(period, &picks, instance.rounds_total);

        for (participant, held) in plan.short {
            warn!(
                "Week {}: {} holds {} picks, expected {}; skipping roster",
                period, participant, held, instance.rounds_total
            );
            report.skipped.push(participant);
        }

        for roster in plan.rosters {
            match self.store.upsert_roster_record(&roster) {
                Ok(true) => report.created.push(roster.participant),
                Ok(false) => report.existing.push(roster.participant),
                Err(e) => {
                    warn!(
                        "Week {}: failed to record roster for {}: {:#}",
                        period, roster.participant, e
                    );
                    report.failed.push(roster.participant);
                }
            }
        }

        info!(
            "Week {} consolidation: {} created, {} existing, {} skipped, {} failed",
            period,
            report.created.len(),
            report.existing.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Add a custom driver to the catalog. Returns `false` if the driver was
    /// already known.
    pub fn register_item(&self, name: &str) -> Result<bool, DraftError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::InvalidItem);
        }
        let added = self.store.register_item(name, true)?;
        if added {
            info!("Registered custom driver {}", name);
        }
        Ok(added)
    }

    pub fn picks(&self, period: u32) -> Result<Vec<DraftPick>, DraftError> {
        Ok(self.store.list_picks(period)?)
    }

    pub fn picks_for(&self, period: u32, participant: &str) -> Result<Vec<DraftPick>, DraftError> {
        Ok(self.store.list_picks_for(period, participant.trim())?)
    }

    /// Final rosters for `period`, ordered by participant.
    pub fn rosters(&self, period: u32) -> Result<Vec<RosterRecord>, DraftError> {
        Ok(self.store.roster_records(period)?)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::db::Database;
    use crate::store::{DraftStore, DraftView, LockedDraft};

    /// Delegates to `Database`, with roster writes refused for one
    /// participant and roster reads refused on demand.
    struct FlakyRosters {
        inner: Database,
        refuse_writes_for: RefCell<Option<String>>,
        refuse_reads: Cell<bool>,
        writes: Cell<usize>,
    }

    impl DraftStore for FlakyRosters {
        fn load_instance(&self, period: u32) -> anyhow::Result<Option<DraftInstance>> {
            self.inner.load_instance(period)
        }

        fn create_instance(&self, instance: &DraftInstance) -> anyhow::Result<()> {
            self.inner.create_instance(instance)
        }

        fn with_exclusive_instance_lock<T, F>(&self, period: u32, f: F) -> Result<T, DraftError>
        where
            F: FnOnce(&mut dyn LockedDraft) -> Result<T, DraftError>,
        {
            self.inner.with_exclusive_instance_lock(period, f)
        }

        fn read_snapshot(&self, period: u32) -> anyhow::Result<Option<DraftView>> {
            self.inner.read_snapshot(period)
        }

        fn list_picks(&self, period: u32) -> anyhow::Result<Vec<DraftPick>> {
            self.inner.list_picks(period)
        }

        fn list_picks_for(&self, period: u32, participant: &str) -> anyhow::Result<Vec<DraftPick>> {
            self.inner.list_picks_for(period, participant)
        }

        fn item_catalog(&self, period: u32) -> anyhow::Result<Vec<String>> {
            self.inner.item_catalog(period)
        }

        fn register_item(&self, name: &str, custom: bool) -> anyhow::Result<bool> {
            self.inner.register_item(name, custom)
        }

        fn upsert_roster_record(&self, record: &RosterRecord) -> anyhow::Result<bool> {
            self.writes.set(self.writes.get() + 1);
            if self.refuse_writes_for.borrow().as_deref() == Some(record.participant.as_str()) {
                anyhow::bail!("roster write for {} refused", record.participant);
            }
            self.inner.upsert_roster_record(record)
        }

        fn roster_record(
            &self,
            participant: &str,
            period: u32,
        ) -> anyhow::Result<Option<RosterRecord>> {
            self.inner.roster_record(participant, period)
        }

        fn roster_records(&self, period: u32) -> anyhow::Result<Vec<RosterRecord>> {
            if self.refuse_reads.get() {
                anyhow::bail!("roster table unreadable");
            }
            self.inner.roster_records(period)
        }
    }

    fn flaky_engine(drivers: &[&str]) -> DraftEngine<FlakyRosters> {
        let inner = Database::open(":memory:").expect("in-memory database should open");
        inner.import_catalog(&names(drivers)).unwrap();
        DraftEngine::new(FlakyRosters {
            inner,
            refuse_writes_for: RefCell::new(None),
            refuse_reads: Cell::new(false),
            writes: Cell::new(0),
        })
    }

    fn play_ab_draft<S: DraftStore>(engine: &DraftEngine<S>) -> PickReceipt {
        engine.start_draft(1, &names(&["A", "B"]), 2).unwrap();
        engine.submit_pick(1, "A", "x").unwrap();
        engine.submit_pick(1, "B", "y").unwrap();
        engine.submit_pick(1, "B", "z").unwrap();
        engine.submit_pick(1, "A", "w").unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn engine_with_catalog(drivers: &[&str]) -> DraftEngine<Database> {
        let db = Database::open(":memory:").expect("in-memory database should open");
        db.import_catalog(&names(drivers)).unwrap();
        DraftEngine::new(db)
    }

    #[test]
    fn state_query_retries_missing_rosters() {
        let engine = engine_with_catalog(&["x", "y", "z", "w"]);
        play_ab_draft(&engine);

        // Simulate a roster write that never landed.
        engine
            .store()
            .conn()
            .unwrap()
            .execute("DELETE FROM roster_records WHERE participant = 'B'", [])
            .unwrap();
        assert_eq!(engine.rosters(1).unwrap().len(), 1);

        let snapshot = engine.get_state(1).unwrap();
        assert_eq!(snapshot.status, DraftStatus::Complete);

        let rosters = engine.rosters(1).unwrap();
        assert_eq!(rosters.len(), 2);
        assert_eq!(rosters[1].items, vec!["y", "z"]);
    }

    #[test]
    fn failed_roster_write_spares_others_and_is_retried_by_state_query() {
        let engine = flaky_engine(&["x", "y", "z", "w"]);
        *engine.store().refuse_writes_for.borrow_mut() = Some("A".into());

        let last = play_ab_draft(&engine);
        let report = last.consolidation.as_ref().expect("completion should consolidate");
        assert_eq!(report.failed, vec!["A"]);
        assert_eq!(report.created, vec!["B"]);
        assert!(!report.is_clean());
        // The pick that completed the draft still stands.
        assert!(last.completed_draft());
        assert_eq!(engine.picks(1).unwrap().len(), 4);

        // Still refused: the state query succeeds anyway.
        let snapshot = engine.get_state(1).unwrap();
        assert_eq!(snapshot.status, DraftStatus::Complete);
        assert!(engine.store().roster_record("A", 1).unwrap().is_none());

        *engine.store().refuse_writes_for.borrow_mut() = None;
        engine.get_state(1).unwrap();

        let rosters = engine.rosters(1).unwrap();
        assert_eq!(rosters.len(), 2);
        assert_eq!(rosters[0].items, vec!["x", "w"]);
        assert_eq!(rosters[1].items, vec!["y", "z"]);
    }

    #[test]
    fn state_query_survives_unreadable_rosters() {
        let engine = flaky_engine(&["x", "y", "z", "w"]);
        play_ab_draft(&engine);

        engine.store().refuse_reads.set(true);
        let writes_before = engine.store().writes.get();

        let snapshot = engine.get_state(1).unwrap();
        assert_eq!(snapshot.status, DraftStatus::Complete);
        assert_eq!(snapshot.picks_made, 4);
        assert_eq!(engine.store().writes.get(), writes_before);
    }

    #[test]
    fn state_query_does_not_reconsolidate_for_skipped_participant() {
        let engine = flaky_engine(&["x", "y", "z", "w"]);
        play_ab_draft(&engine);

        // A loses a pick and its roster; only B's roster is still owed.
        {
            let conn = engine.store().inner.conn().unwrap();
            conn.execute("DELETE FROM draft_picks WHERE item = 'w'", []).unwrap();
            conn.execute("DELETE FROM roster_records WHERE participant = 'A'", []).unwrap();
        }
        let writes_before = engine.store().writes.get();

        engine.get_state(1).unwrap();
        engine.get_state(1).unwrap();
        assert_eq!(engine.store().writes.get(), writes_before);
    }

    #[test]
    fn snapshot_lists_current_round_order() {
        let engine = engine_with_catalog(&["x", "y", "z", "w"]);
        engine.start_draft(1, &names(&["A", "B"]), 2).unwrap();
        assert_eq!(engine.get_state(1).unwrap().round_order, vec!["A", "B"]);

        engine.submit_pick(1, "A", "x").unwrap();
        engine.submit_pick(1, "B", "y").unwrap();
        assert_eq!(engine.get_state(1).unwrap().round_order, vec!["B", "A"]);

        engine.submit_pick(1, "B", "z").unwrap();
        engine.submit_pick(1, "A", "w").unwrap();
        assert!(engine.get_state(1).unwrap().round_order.is_empty());
    }

    #[test]
    fn consolidate_on_active_draft_writes_nothing() {
        let engine = engine_with_catalog(&["x", "y", "z", "w"]);
        engine.start_draft(1, &names(&["A", "B"]), 2).unwrap();
        engine.submit_pick(1, "A", "x").unwrap();
        engine.submit_pick(1, "B", "y").unwrap();
        engine.submit_pick(1, "B", "z").unwrap();

        // B already holds both picks, but the draft is not finished.
        let report = engine.consolidate(1).unwrap();
        assert!(report.created.is_empty());
        assert!(engine.rosters(1).unwrap().is_empty());
    }

    #[test]
    fn consolidate_skips_participant_with_missing_pick() {
        let engine = engine_with_catalog(&["x", "y", "z", "w"]);
        play_ab_draft(&engine);

        // Drop one of A's picks and A's roster to mimic a corrupted history.
        {
            let conn = engine.store().conn().unwrap();
            conn.execute("DELETE FROM draft_picks WHERE item = 'w'", []).unwrap();
            conn.execute("DELETE FROM roster_records", []).unwrap();
        }

        let report = engine.consolidate(1).unwrap();
        assert_eq!(report.created, vec!["B"]);
        assert_eq!(report.skipped, vec!["A"]);
        assert!(engine.store().roster_record("A", 1).unwrap().is_none());
    }

    #[test]
    fn register_item_trims_and_rejects_blank() {
        let engine = engine_with_catalog(&[]);
        assert!(engine.register_item("  Local Hero ").unwrap());
        assert!(!engine.register_item("Local Hero").unwrap());
        assert!(matches!(
            engine.register_item("   ").unwrap_err(),
            DraftError::InvalidItem
        ));
        assert_eq!(engine.store().item_catalog(1).unwrap(), vec!["Local Hero"]);
    }

    #[test]
    fn submissions_are_trimmed() {
        let engine = engine_with_catalog(&["x", "y"]);
        engine.start_draft(1, &names(&["A", "B"]), 1).unwrap();
        let receipt = engine.submit_pick(1, " A ", " x\n").unwrap();
        assert_eq!(receipt.pick.participant, "A");
        assert_eq!(receipt.pick.item, "x");
    }
}
