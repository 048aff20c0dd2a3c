//! # tabula-protocol — wire protocol shared by the game client and server
//!
//! Every exchange between a connector and the server is one [`Command`]:
//! a uniquely identified envelope around a closed set of payload kinds.
//! Requests flow client → server; the server answers each request with an
//! acknowledgment (a `Command` whose id equals the request id) and may
//! push unsolicited commands the other way at any time.
//!
//! ```text
//! GameConnector ──── Command { id, kind } ────► CommandServer
//!               ◄─── Command { id, Ack(reply) } ───
//!               ◄─── Command { id', UpdateState } ─   (push / broadcast)
//! ```
//!
//! ## Modules
//!
//! - [`command`] — the envelope, its id assignment and the bincode codec
//! - [`reply`] — acknowledgment payloads and per-command status sets
//! - [`state`] — composite state-snapshot payloads (pack + fragments)
//! - [`version`] — protocol version and handshake compatibility rules

pub mod command;
pub mod reply;
pub mod state;
pub mod version;

pub use command::{Ack, Command, CommandId, CommandKind, WireError};
pub use reply::{ClientInfo, HandshakeStatus, JoinStatus, LeaveStatus, Reply, ReplyStatus};
pub use state::{GameState, Pack, StateUpdate};
