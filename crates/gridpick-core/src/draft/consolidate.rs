// Folding a finished draft's picks into per-participant rosters.

use std::collections::BTreeMap;

use serde::Serialize;

use super::pick::{DraftPick, RosterRecord};

/// What the pick history says each participant's roster should be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationPlan {
    /// Participants holding exactly `rounds_total` picks, ready to record.
    pub rosters: Vec<RosterRecord>,
    /// Participants with a pick count other than `rounds_total`, and that count.
    pub short: Vec<(String, usize)>,
}

/// Outcome of writing a consolidation plan to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub period: u32,
    /// Participants whose roster was written by this run.
    pub created: Vec<String>,
    /// Participants whose roster already existed.
    pub existing: Vec<String>,
    /// Participants skipped for holding the wrong number of picks.
    pub skipped: Vec<String>,
    /// Participants whose roster write failed; retried on a later run.
    pub failed: Vec<String>,
}

impl ConsolidationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Group `picks` by participant and order each group by round.
///
/// Participants appear in name order. A group becomes a roster only if it
/// holds exactly `rounds_total` picks; otherwise it is reported as short.
pub fn plan(period: u32, picks: &[DraftPick], rounds_total: u32) -> ConsolidationPlan {
    let mut by_participant: BTreeMap<&str, Vec<&DraftPick>> = BTreeMap::new();
    for pick in picks.iter().filter(|p| p.period == period) {
        by_participant
            .entry(pick.participant.as_str())
            .or_default()
            .push(pick);
    }

    let mut result = ConsolidationPlan::default();
    for (participant, mut held) in by_participant {
        if held.len() != rounds_total as usize {
            result.short.push((participant.to_string(), held.len()));
            continue;
        }
        held.sort_by_key(|p| (p.round, p.seq));
        result.rosters.push(RosterRecord {
            participant: participant.to_string(),
            period,
            items: held.iter().map(|p| p.item.clone()).collect(),
        });
    }
    result
}
