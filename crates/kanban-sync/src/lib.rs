//! Optimistic board state kept in sync with an [`EntityStore`] by polling.
//!
//! [`MutationController`] applies drags and edits locally before they are
//! persisted and restores a snapshot if persistence fails.
//! [`PollScheduler`] shares one timer per collection between all of its
//! subscribers. [`BoardSession`] ties both to a single board.
//!
//! [`EntityStore`]: kanban_persistence::EntityStore

pub mod controller;
pub mod poller;
pub mod sequencer;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{DragEnd, DragOutcome, MutationController, PatchOutcome};
pub use poller::{OnUpdate, PollResult, PollScheduler, Subscription};
pub use sequencer::{Sequencer, Ticket};
pub use session::BoardSession;
pub use state::{BoardSnapshot, BoardState};
