// Draft outcome taxonomy shared by the engine and its callers.

use thiserror::Error;

/// Every way a draft operation can fail to take effect.
///
/// All variants are expected outcomes the caller can act on. The three pick
/// rejections (`DraftComplete`, `NotYourTurn`, `ItemUnavailable`) are
/// terminal for the request that produced them; the core never retries.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no draft exists for week {period}")]
    DraftNotFound { period: u32 },

    #[error("the draft for week {period} is complete")]
    DraftComplete { period: u32 },

    #[error("it is {on_the_clock}'s turn, not {participant}'s")]
    NotYourTurn {
        participant: String,
        on_the_clock: String,
    },

    #[error("driver `{item}` is not available")]
    ItemUnavailable { item: String },

    #[error("invalid draft order: {reason}")]
    InvalidOrder { reason: String },

    #[error("invalid round count {rounds_total}: must be at least 1")]
    InvalidRounds { rounds_total: u32 },

    #[error("driver name must not be blank")]
    InvalidItem,

    /// The storage collaborator failed. Nothing was written, so re-running
    /// the whole operation is safe.
    #[error(transparent)]
    StorageUnavailable(#[from] anyhow::Error),
}

impl DraftError {
    /// Whether this is one of the pick rejections a participant can receive
    /// from `submit_pick`.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DraftError::DraftComplete { .. }
                | DraftError::NotYourTurn { .. }
                | DraftError::ItemUnavailable { .. }
        )
    }

    /// Short machine-readable name for this outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            DraftError::DraftNotFound { .. } => "DraftNotFound",
            DraftError::DraftComplete { .. } => "DraftComplete",
            DraftError::NotYourTurn { .. } => "NotYourTurn",
            DraftError::ItemUnavailable { .. } => "ItemUnavailable",
            DraftError::InvalidOrder { .. } => "InvalidOrder",
            DraftError::InvalidRounds { .. } => "InvalidRounds",
            DraftError::InvalidItem => "InvalidItem",
            DraftError::StorageUnavailable(_) => "StorageUnavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_the_three_pick_outcomes() {
        assert!(DraftError::DraftComplete { period: 1 }.is_rejection());
        assert!(DraftError::NotYourTurn {
            participant: "a".into(),
            on_the_clock: "b".into(),
        }
        .is_rejection());
        assert!(DraftError::ItemUnavailable { item: "x".into() }.is_rejection());

        assert!(!DraftError::DraftNotFound { period: 1 }.is_rejection());
        assert!(!DraftError::InvalidRounds { rounds_total: 0 }.is_rejection());
        assert!(!DraftError::StorageUnavailable(anyhow::anyhow!("disk gone")).is_rejection());
    }

    #[test]
    fn storage_errors_keep_their_context() {
        let err: DraftError = anyhow::anyhow!("locked")
            .context("failed to begin draft transaction")
            .into();
        assert_eq!(err.kind(), "StorageUnavailable");
        assert_eq!(err.to_string(), "failed to begin draft transaction");
    }

    #[test]
    fn not_your_turn_names_both_participants() {
        let err = DraftError::NotYourTurn {
            participant: "player2".into(),
            on_the_clock: "player1".into(),
        };
        assert_eq!(err.to_string(), "it is player1's turn, not player2's");
    }
}
