//! # tabula-client — connector library for the game protocol
//!
//! Manages one logical connection to a game server and the command
//! traffic over it.
//!
//! ```text
//! game code ──► GameConnector ──► Transport ──► wire
//!                    │                 │
//!                    │        inbound-reading task
//!                    │                 │
//!                    ◄── pending-table lookup by id ──┘
//!                         hit  → one-shot reply handler
//!                         miss → general handler (server pushes)
//! ```
//!
//! ## Modules
//!
//! - [`endpoint`] — `scheme://[userinfo@]host:port` parsing and validation
//! - [`transport`] — the transport capability set and the WebSocket
//!   implementation over TCP
//! - [`connector`] — connection state, last-operation status mailbox,
//!   command correlation

pub mod connector;
pub mod endpoint;
pub mod transport;

pub use connector::GameConnector;
pub use endpoint::{Endpoint, EndpointError};
pub use transport::{InboundHandler, Transport, TransportError, WsTransport};
