//! The command envelope and its binary codec.
//!
//! Wire format (bincode-encoded, one record per transport frame):
//! ```text
//! ┌──────────┬───────────────────────────────┐
//! │ id       │ kind                          │
//! │ 8 bytes  │ tag + kind-specific payload   │
//! └──────────┴───────────────────────────────┘
//! ```
//!
//! Ids are assigned from a process-wide monotonic counter, so every
//! command ever issued by one process carries a distinct id. That is what
//! lets a connector multiplex correlated request/reply exchanges and
//! fire-and-forget sends on a single stream.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::reply::Reply;
use crate::state::StateUpdate;

/// Unique, monotonically assigned command identity.
pub type CommandId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// The unit of exchange between client and server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub kind: CommandKind,
}

/// Closed set of command payloads.
///
/// Adding a kind is a compile-time-checked extension: every dispatcher
/// matches exhaustively, there is no runtime default branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Client announces its connector version; first thing on the wire.
    Handshake { version: String },
    /// Connection health check; the server echoes the message back.
    Echo { message: String },
    /// Register the sender as a player in the running game.
    JoinGame { player: String },
    /// Remove the sender from the running game.
    LeaveGame,
    /// Ask for the sender's registration info and session timestamps.
    GetInfo,
    /// Server-pushed composite state snapshot.
    UpdateState(StateUpdate),
    /// Acknowledgment of a request; the envelope id is the request id.
    /// `None` is the sentinel for "nothing could handle this".
    Ack { reply: Option<Reply> },
}

impl Command {
    /// Wrap a payload in a fresh envelope with the next process-wide id.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
        }
    }

    pub fn handshake(version: impl Into<String>) -> Self {
        Self::new(CommandKind::Handshake {
            version: version.into(),
        })
    }

    pub fn echo(message: impl Into<String>) -> Self {
        Self::new(CommandKind::Echo {
            message: message.into(),
        })
    }

    pub fn join_game(player: impl Into<String>) -> Self {
        Self::new(CommandKind::JoinGame {
            player: player.into(),
        })
    }

    pub fn leave_game() -> Self {
        Self::new(CommandKind::LeaveGame)
    }

    pub fn get_info() -> Self {
        Self::new(CommandKind::GetInfo)
    }

    pub fn update_state(update: StateUpdate) -> Self {
        Self::new(CommandKind::UpdateState(update))
    }

    /// The acknowledgment payload, if this command carries one.
    pub fn reply(&self) -> Option<&Reply> {
        match &self.kind {
            CommandKind::Ack { reply } => reply.as_ref(),
            _ => None,
        }
    }

    /// Serialize to the binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| WireError::Encode(e.to_string()))
    }

    /// Deserialize from the binary wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let (cmd, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| WireError::Decode(e.to_string()))?;
        Ok(cmd)
    }
}

/// Acknowledgment produced by the server for one inbound request.
///
/// Carries the request's identity so the client side can route the reply
/// back to exactly the caller that issued the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub request_id: CommandId,
    pub reply: Option<Reply>,
}

impl Ack {
    pub fn new(request_id: CommandId, reply: Reply) -> Self {
        Self {
            request_id,
            reply: Some(reply),
        }
    }

    /// The "no acknowledgment" sentinel: nothing handled the request.
    pub fn none(request_id: CommandId) -> Self {
        Self {
            request_id,
            reply: None,
        }
    }

    /// Convert into the wire envelope; the envelope id is the request id.
    pub fn into_command(self) -> Command {
        Command {
            id: self.request_id,
            kind: CommandKind::Ack { reply: self.reply },
        }
    }
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq)]
pub enum WireError {
    Encode(String),
    Decode(String),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for WireError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{Reply, ReplyStatus};

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = Command::echo("one");
        let b = Command::leave_game();
        let c = Command::get_info();
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn test_command_roundtrip() {
        let cmd = Command::join_game("ziutek");
        let decoded = Command::decode(&cmd.encode().unwrap()).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_ack_carries_request_id() {
        let req = Command::echo("hello");
        let ack = Ack::new(
            req.id,
            Reply::Echo {
                status: ReplyStatus::Ok,
                message: "hello".into(),
            },
        );
        let wire = ack.into_command();
        assert_eq!(wire.id, req.id);
        assert!(wire.reply().is_some());
    }

    #[test]
    fn test_no_ack_sentinel() {
        let wire = Ack::none(7).into_command();
        assert_eq!(wire.id, 7);
        assert_eq!(wire.reply(), None);
        assert!(matches!(wire.kind, CommandKind::Ack { reply: None }));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(Command::decode(&[0xFF, 0xFE, 0xFD]).is_err());
    }

    #[test]
    fn test_reply_accessor_on_requests() {
        assert_eq!(Command::get_info().reply(), None);
    }
}
