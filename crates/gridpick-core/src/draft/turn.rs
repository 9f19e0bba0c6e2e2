// Snake-order turn resolution.

/// Return the participant on the clock for a given round and in-round index.
///
/// Odd rounds walk `order` front to back; even rounds walk it back to front,
/// so whoever picks last in one round picks first in the next.
///
/// The caller guarantees `order` is non-empty and `index < order.len()`.
pub fn on_the_clock(order: &[String], round: u32, index: usize) -> &str {
    let slot = if round % 2 == 1 {
        index
    } else {
        order.len() - 1 - index
    };
    &order[slot]
}

/// The full pick sequence for one round, in the order participants act.
pub fn round_sequence(order: &[String], round: u32) -> Vec<&str> {
    (0..order.len())
        .map(|index| on_the_clock(order, round, index))
        .collect()
}
