//! Composite state-snapshot payloads.
//!
//! A snapshot is built for one [`Pack`] selector; independent server-side
//! contributors append the fragments they care about, so unrelated
//! subsystems (roster, board) end up in one outbound message without the
//! snapshot builder knowing their types.

use serde::{Deserialize, Serialize};

/// Selector naming which subset of state a snapshot should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pack {
    /// Everything a freshly joined player needs.
    AfterJoinGame,
    /// The current roster, broadcast whenever it changes.
    PlayersList,
}

/// One typed fragment of game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameState {
    Board { size: u32 },
    Players { names: Vec<String> },
}

/// A pack selector plus the fragments contributed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub pack: Pack,
    pub states: Vec<GameState>,
}

impl StateUpdate {
    pub fn new(pack: Pack) -> Self {
        Self {
            pack,
            states: Vec::new(),
        }
    }

    /// Append a fragment; chainable for contributors that add several.
    pub fn add(&mut self, state: GameState) -> &mut Self {
        self.states.push(state);
        self
    }
}
