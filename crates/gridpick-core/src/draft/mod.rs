// Snake draft turn-state machine.

pub mod availability;
pub mod consolidate;
pub mod engine;
pub mod instance;
pub mod pick;
pub mod turn;
pub mod validate;

pub use engine::{DraftEngine, DraftSnapshot, PickReceipt};
pub use instance::{DraftInstance, DraftStatus};
pub use pick::{DraftPick, RosterRecord};
