//! # tabula-server — game server for the tabula command protocol
//!
//! Architecture:
//! ```text
//! connector ──┐
//!              ├── CommandServer ── executor ── GameServer router
//! connector ──┘        │                            │
//!                      │                 ┌──────────┼──────────┐
//!                      │                 ▼          ▼          ▼
//!                      │              Game        Board    SnapshotBuilder
//!                      │                                        │
//!                      └──── unicast / broadcast ◄──────────────┘
//! ```
//!
//! [`net::CommandServer`] is the transport layer: it accepts connections,
//! runs one handling task per connection, answers every inbound command
//! with an acknowledgment produced by a registered executor, and offers
//! best-effort push primitives. [`server::GameServer`] is the domain
//! layer: it wires the executor to the game rules (handshake, echo,
//! join/leave, get-info) and broadcasts state snapshots assembled by the
//! injected contributor list.

pub mod game;
pub mod net;
pub mod server;
pub mod snapshot;

pub use game::{Board, Game, Player};
pub use net::{ClientHandle, CommandServer, ServerError};
pub use server::{GameServer, GameServerConfig};
pub use snapshot::{SnapshotBuilder, StateSource};
