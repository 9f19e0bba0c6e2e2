// Storage collaborator contract for the draft engine.

use anyhow::Result;

use crate::draft::instance::DraftInstance;
use crate::draft::pick::{DraftPick, RosterRecord};
use crate::error::DraftError;

/// A consistent read of one week's draft: instance, picks and catalog all
/// taken from the same committed state.
#[derive(Debug, Clone)]
pub struct DraftView {
    pub instance: DraftInstance,
    pub picks: Vec<DraftPick>,
    pub catalog: Vec<String>,
}

/// Exclusive, writable view of one week's draft.
///
/// Handed to the closure passed to [`DraftStore::with_exclusive_instance_lock`].
/// Every read reflects writes already made through the same view, and
/// nothing becomes visible to other callers until the closure returns `Ok`.
pub trait LockedDraft {
    /// The instance as read after the lock was taken.
    fn instance(&self) -> &DraftInstance;

    fn picks(&self) -> Result<Vec<DraftPick>>;

    fn catalog(&self) -> Result<Vec<String>>;

    /// Record a pick for this view's week and return it as stored.
    fn append_pick(&mut self, round: u32, participant: &str, item: &str) -> Result<DraftPick>;

    /// Persist the pointer and status of `instance`.
    fn save_instance(&mut self, instance: &DraftInstance) -> Result<()>;
}

/// Everything the draft engine needs from persistence.
///
/// Implementations must make `with_exclusive_instance_lock` serializable per
/// week: two overlapping calls for the same week never interleave.
pub trait DraftStore {
    fn load_instance(&self, period: u32) -> Result<Option<DraftInstance>>;

    /// Store `instance` as the draft for its week, discarding any previous
    /// instance, picks and rosters for that week.
    fn create_instance(&self, instance: &DraftInstance) -> Result<()>;

    /// Run `f` with exclusive, atomically-writable access to the week's
    /// draft. Commits when `f` returns `Ok`, rolls back otherwise.
    ///
    /// Returns [`DraftError::DraftNotFound`] if no draft exists for `period`.
    fn with_exclusive_instance_lock<T, F>(&self, period: u32, f: F) -> Result<T, DraftError>
    where
        F: FnOnce(&mut dyn LockedDraft) -> Result<T, DraftError>;

    /// Instance, picks and catalog for `period` from a single read.
    fn read_snapshot(&self, period: u32) -> Result<Option<DraftView>>;

    /// All picks for `period` in the order they were made.
    fn list_picks(&self, period: u32) -> Result<Vec<DraftPick>>;

    fn list_picks_for(&self, period: u32, participant: &str) -> Result<Vec<DraftPick>>;

    /// Every driver claimable in `period`.
    fn item_catalog(&self, period: u32) -> Result<Vec<String>>;

    /// Append a driver to the catalog. Returns `false` if it was already known.
    fn register_item(&self, name: &str, custom: bool) -> Result<bool>;

    /// Store a roster unless one exists for the same participant and week.
    /// Returns `true` if this call created it.
    fn upsert_roster_record(&self, record: &RosterRecord) -> Result<bool>;

    fn roster_record(&self, participant: &str, period: u32) -> Result<Option<RosterRecord>>;

    /// All rosters for `period`, ordered by participant.
    fn roster_records(&self, period: u32) -> Result<Vec<RosterRecord>>;
}
