//! Snapshot assembly from independent state contributors.
//!
//! Subsystems that own a slice of game state implement [`StateSource`]
//! and are handed to a [`SnapshotBuilder`] at composition time. Building
//! a snapshot for a pack selector runs every contributor over the same
//! update; each appends its fragments only when the selector matches, so
//! the builder never learns the contributors' types and unrelated
//! subsystems end up in one composite message.

use std::sync::Arc;

use tabula_protocol::{Command, Pack, StateUpdate};

/// A component that can contribute fragments to a state snapshot.
pub trait StateSource: Send + Sync {
    /// Append fragments for the update's pack selector, or do nothing.
    fn populate(&self, update: &mut StateUpdate);
}

/// Ordered list of contributors, fixed at composition time.
pub struct SnapshotBuilder {
    sources: Vec<Arc<dyn StateSource>>,
}

impl SnapshotBuilder {
    pub fn new(sources: Vec<Arc<dyn StateSource>>) -> Self {
        Self { sources }
    }

    /// Build an update-state command for the given pack selector.
    pub fn build(&self, pack: Pack) -> Command {
        let mut update = StateUpdate::new(pack);
        for source in &self.sources {
            source.populate(&mut update);
        }
        Command::update_state(update)
    }
}
