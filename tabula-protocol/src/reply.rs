//! Acknowledgment payloads.
//!
//! Each request kind has its own status set; protocol-level outcomes
//! (wrong version, joining twice, asking for info before joining) travel
//! as these values, never as transport failures.

use serde::{Deserialize, Serialize};

/// The response half of an acknowledgment, one variant per request kind
/// that expects an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Handshake {
        status: HandshakeStatus,
    },
    Echo {
        status: ReplyStatus,
        message: String,
    },
    Join {
        status: JoinStatus,
        client_id: String,
    },
    Leave {
        status: LeaveStatus,
    },
    Info {
        status: ReplyStatus,
        info: ClientInfo,
    },
}

/// Outcome of a version handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeStatus {
    Ok,
    VersionTooLow,
    VersionMalformed,
}

/// Outcome of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStatus {
    Ok,
    AlreadyConnected,
}

/// Outcome of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Ok,
    NotConnected,
}

/// General request outcome where no dedicated set exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    Ok,
    ClientNotFound,
}

/// Registration info returned by a get-info request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: String,
    /// Epoch millis when the game session started.
    pub game_started_at_ms: u64,
    /// Epoch millis when this connection was accepted.
    pub connected_at_ms: u64,
}

impl ClientInfo {
    /// Placeholder for requesters that never joined.
    pub fn empty() -> Self {
        Self::default()
    }
}
