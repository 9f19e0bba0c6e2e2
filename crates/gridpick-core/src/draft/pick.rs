// Recorded picks and the consolidated rosters built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single accepted pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    /// Monotonic ordering key assigned by storage.
    pub seq: i64,
    /// Race week the pick belongs to.
    pub period: u32,
    /// Round in which the pick was made (1-based).
    pub round: u32,
    pub participant: String,
    /// Driver name.
    pub item: String,
    pub picked_at: DateTime<Utc>,
}

/// A participant's final roster for one week: one driver per round, in
/// round order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    pub participant: String,
    pub period: u32,
    pub items: Vec<String>,
}
