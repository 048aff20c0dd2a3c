//! Game logic collaborators: the roster and the board.
//!
//! The connection layer consumes these through three narrow seams only:
//! register a player, remove a player, and the snapshot populate hook.

use std::sync::Mutex;

use tabula_protocol::{GameState, JoinStatus, LeaveStatus, Pack, StateUpdate};

use crate::net::now_ms;
use crate::snapshot::StateSource;

/// A registered participant.
#[derive(Debug, Clone)]
pub struct Player {
    name: String,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The running game session.
///
/// Keeps the roster in join order. Methods may be called concurrently
/// from any connection's handling task.
pub struct Game {
    started_at_ms: u64,
    players: Mutex<Vec<(String, Player)>>,
}

impl Game {
    pub fn new() -> Self {
        Self {
            started_at_ms: now_ms(),
            players: Mutex::new(Vec::new()),
        }
    }

    /// Game-specific startup hook.
    pub fn start(&self) {
        log::info!("game session started");
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    /// Register a player under the given client id.
    pub fn add_player(&self, client_id: &str, player: Player) -> JoinStatus {
        let mut players = self.players.lock().unwrap();
        if players.iter().any(|(id, _)| id == client_id) {
            return JoinStatus::AlreadyConnected;
        }
        players.push((client_id.to_string(), player));
        JoinStatus::Ok
    }

    /// Remove the player registered under the given client id.
    pub fn remove_player(&self, client_id: &str) -> LeaveStatus {
        let mut players = self.players.lock().unwrap();
        match players.iter().position(|(id, _)| id == client_id) {
            Some(index) => {
                players.remove(index);
                LeaveStatus::Ok
            }
            None => LeaveStatus::NotConnected,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.lock().unwrap().len()
    }

    /// Player names in join order.
    pub fn player_names(&self) -> Vec<String> {
        self.players
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.name().to_string())
            .collect()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSource for Game {
    fn populate(&self, update: &mut StateUpdate) {
        if update.pack == Pack::PlayersList {
            update.add(GameState::Players {
                names: self.player_names(),
            });
        }
    }
}

/// The game board.
pub struct Board {
    size: u32,
}

impl Board {
    pub fn new() -> Self {
        Self { size: 16 }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSource for Board {
    fn populate(&self, update: &mut StateUpdate) {
        if update.pack == Pack::AfterJoinGame {
            update.add(GameState::Board { size: self.size });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_player() {
        let game = Game::new();
        assert_eq!(game.add_player("c1", Player::new("ziutek")), JoinStatus::Ok);
        assert_eq!(game.player_count(), 1);
        assert_eq!(game.remove_player("c1"), LeaveStatus::Ok);
        assert_eq!(game.player_count(), 0);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let game = Game::new();
        game.add_player("c1", Player::new("ziutek"));
        assert_eq!(
            game.add_player("c1", Player::new("ziutek")),
            JoinStatus::AlreadyConnected
        );
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_leave_unknown_player() {
        let game = Game::new();
        assert_eq!(game.remove_player("ghost"), LeaveStatus::NotConnected);
        // The empty id never matches either: a handle that never joined
        // cannot leave.
        assert_eq!(game.remove_player(""), LeaveStatus::NotConnected);
    }

    #[test]
    fn test_roster_keeps_join_order() {
        let game = Game::new();
        game.add_player("c1", Player::new("alice"));
        game.add_player("c2", Player::new("bob"));
        game.add_player("c3", Player::new("carol"));
        game.remove_player("c2");
        assert_eq!(game.player_names(), vec!["alice", "carol"]);
    }

    #[test]
    fn test_game_contributes_roster_fragment() {
        let game = Game::new();
        game.add_player("c1", Player::new("ziutek"));

        let mut update = StateUpdate::new(Pack::PlayersList);
        game.populate(&mut update);
        assert_eq!(
            update.states,
            vec![GameState::Players {
                names: vec!["ziutek".into()]
            }]
        );

        let mut other = StateUpdate::new(Pack::AfterJoinGame);
        game.populate(&mut other);
        assert!(other.states.is_empty());
    }

    #[test]
    fn test_board_contributes_after_join() {
        let board = Board::new();
        let mut update = StateUpdate::new(Pack::AfterJoinGame);
        board.populate(&mut update);
        assert_eq!(update.states, vec![GameState::Board { size: 16 }]);

        let mut other = StateUpdate::new(Pack::PlayersList);
        board.populate(&mut other);
        assert!(other.states.is_empty());
    }
}
