// Pick preconditions, checked against the state read under the week's lock.

use super::availability;
use super::instance::DraftInstance;
use super::pick::DraftPick;
use crate::error::DraftError;

/// Check that `participant` may take `item` right now.
///
/// Checks run in a fixed order and the first failure wins: the draft must
/// be active, `participant` must be on the clock, and `item` must be in the
/// catalog and unclaimed.
pub fn validate_pick(
    instance: &DraftInstance,
    participant: &str,
    item: &str,
    catalog: &[String],
    picks: &[DraftPick],
) -> Result<(), DraftError> {
    let Some(on_the_clock) = instance.on_the_clock() else {
        return Err(DraftError::DraftComplete {
            period: instance.period,
        });
    };

    if participant != on_the_clock {
        return Err(DraftError::NotYourTurn {
            participant: participant.to_string(),
            on_the_clock: on_the_clock.to_string(),
        });
    }

    if !availability::is_available(catalog, picks, item) {
        return Err(DraftError::ItemUnavailable {
            item: item.to_string(),
        });
    }

    Ok(())
}
