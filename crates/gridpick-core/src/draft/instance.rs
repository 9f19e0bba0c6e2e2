// Per-week draft instance and its position pointer.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::turn;
use crate::error::DraftError;

/// Whether a draft still accepts picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Active,
    Complete,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Active => "active",
            DraftStatus::Complete => "complete",
        }
    }

    pub fn from_str_status(s: &str) -> Option<Self> {
        match s {
            "active" => Some(DraftStatus::Active),
            "complete" => Some(DraftStatus::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The draft for one race week.
///
/// `status` is `Complete` exactly when `current_round > rounds_total`. While
/// active, `(current_round, current_index)` names the next turn to be taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInstance {
    pub period: u32,
    /// Participant order for odd rounds. Fixed at creation.
    pub order: Vec<String>,
    pub current_round: u32,
    pub current_index: usize,
    pub rounds_total: u32,
    pub status: DraftStatus,
}

impl DraftInstance {
    /// Build a fresh draft positioned at round 1, index 0.
    ///
    /// Participant names are trimmed. The order must be non-empty, free of
    /// blanks and duplicates, and contain every name in `required`.
    pub fn new(
        period: u32,
        order: &[String],
        rounds_total: u32,
        required: &[String],
    ) -> Result<Self, DraftError> {
        let order = validate_order(order, required)?;
        if rounds_total == 0 {
            return Err(DraftError::InvalidRounds { rounds_total });
        }

        Ok(DraftInstance {
            period,
            order,
            current_round: 1,
            current_index: 0,
            rounds_total,
            status: DraftStatus::Active,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.status == DraftStatus::Complete
    }

    /// The participant entitled to the next pick, or `None` once complete.
    pub fn on_the_clock(&self) -> Option<&str> {
        if self.is_complete() {
            return None;
        }
        Some(turn::on_the_clock(
            &self.order,
            self.current_round,
            self.current_index,
        ))
    }

    /// Number of picks a complete draft holds.
    pub fn total_picks(&self) -> usize {
        self.order.len() * self.rounds_total as usize
    }

    /// Number of picks taken so far, derived from the pointer.
    pub fn picks_made(&self) -> usize {
        let full_rounds = (self.current_round - 1) as usize;
        (full_rounds * self.order.len() + self.current_index).min(self.total_picks())
    }

    /// Move the pointer past the turn that was just taken.
    ///
    /// Rolls over to index 0 of the next round at the end of a round and
    /// marks the draft complete once the round passes `rounds_total`.
    pub fn advance(&mut self) {
        if self.current_index + 1 < self.order.len() {
            self.current_index += 1;
        } else {
            self.current_index = 0;
            self.current_round += 1;
        }

        if self.current_round > self.rounds_total {
            self.status = DraftStatus::Complete;
        }
    }
}

fn validate_order(order: &[String], required: &[String]) -> Result<Vec<String>, DraftError> {
    if order.is_empty() {
        return Err(DraftError::InvalidOrder {
            reason: "order is empty".into(),
        });
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(order.len());
    for name in order {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::InvalidOrder {
                reason: "order contains a blank participant".into(),
            });
        }
        if !seen.insert(name.to_string()) {
            return Err(DraftError::InvalidOrder {
                reason: format!("participant `{name}` appears more than once"),
            });
        }
        cleaned.push(name.to_string());
    }

    let missing: Vec<&str> = required
        .iter()
        .map(|r| r.trim())
        .filter(|r| !seen.contains(*r))
        .collect();
    if !missing.is_empty() {
        return Err(DraftError::InvalidOrder {
            reason: format!("order omits required participants: {}", missing.join(", ")),
        });
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_draft_starts_at_round_one() {
        let d = DraftInstance::new(3, &names(&["A", "B", "C"]), 2, &[]).unwrap();
        assert_eq!(d.period, 3);
        assert_eq!(d.current_round, 1);
        assert_eq!(d.current_index, 0);
        assert_eq!(d.status, DraftStatus::Active);
        assert_eq!(d.on_the_clock(), Some("A"));
        assert_eq!(d.total_picks(), 6);
        assert_eq!(d.picks_made(), 0);
    }

    #[test]
    fn advance_walks_the_snake_and_completes() {
        let mut d = DraftInstance::new(1, &names(&["A", "B", "C"]), 3, &[]).unwrap();
        let mut seen = Vec::new();
        while let Some(p) = d.on_the_clock() {
            seen.push(p.to_string());
            d.advance();
        }
        assert_eq!(seen, names(&["A", "B", "C", "C", "B", "A", "A", "B", "C"]));
        assert!(d.is_complete());
        assert_eq!(d.current_round, 4);
        assert_eq!(d.current_index, 0);
        assert_eq!(d.picks_made(), 9);
    }

    #[test]
    fn completes_after_exactly_n_times_r_advances() {
        let mut d = DraftInstance::new(1, &names(&["A", "B"]), 4, &[]).unwrap();
        for i in 0..8 {
            assert!(!d.is_complete(), "complete too early at advance {i}");
            d.advance();
        }
        assert!(d.is_complete());
    }

    #[test]
    fn single_participant_single_round() {
        let mut d = DraftInstance::new(1, &names(&["solo"]), 1, &[]).unwrap();
        d.advance();
        assert!(d.is_complete());
        assert_eq!(d.on_the_clock(), None);
    }

    #[test]
    fn rejects_empty_order() {
        let err = DraftInstance::new(1, &[], 2, &[]).unwrap_err();
        assert!(matches!(err, DraftError::InvalidOrder { .. }));
    }

    #[test]
    fn rejects_duplicate_participants_after_trimming() {
        let err = DraftInstance::new(1, &names(&["A", " A "]), 2, &[]).unwrap_err();
        assert!(matches!(err, DraftError::InvalidOrder { .. }));
    }

    #[test]
    fn rejects_blank_participant() {
        let err = DraftInstance::new(1, &names(&["A", "  "]), 2, &[]).unwrap_err();
        assert!(matches!(err, DraftError::InvalidOrder { .. }));
    }

    #[test]
    fn rejects_order_missing_required_participant() {
        let err =
            DraftInstance::new(1, &names(&["A", "B"]), 2, &names(&["A", "B", "C"])).unwrap_err();
        match err {
            DraftError::InvalidOrder { reason } => assert!(reason.contains('C'), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_rounds() {
        let err = DraftInstance::new(1, &names(&["A"]), 0, &[]).unwrap_err();
        assert!(matches!(err, DraftError::InvalidRounds { rounds_total: 0 }));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [DraftStatus::Active, DraftStatus::Complete] {
            assert_eq!(DraftStatus::from_str_status(status.as_str()), Some(status));
        }
        assert_eq!(DraftStatus::from_str_status("paused"), None);
    }

    #[test]
    fn status_serializes_as_stored_form() {
        for status in [DraftStatus::Active, DraftStatus::Complete] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::from(status.as_str()));
            let back: DraftStatus = serde_json::from_value(json).unwrap();
            assert_eq!(back, status);
        }
    }
}
