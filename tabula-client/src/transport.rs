//! Transport capability set and the WebSocket implementation.
//!
//! A transport knows how to open a byte stream to an endpoint, write one
//! framed command at a time, and run a dedicated inbound-reading task
//! that decodes one command per frame for the lifetime of the
//! connection. The connector is generic over this trait, so tests run
//! against an in-memory stub and production runs over TCP.

use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tabula_protocol::{Command, WireError};

use crate::endpoint::Endpoint;

/// Callback invoked by the inbound-reading task for every decoded command.
pub type InboundHandler = Arc<dyn Fn(Command) + Send + Sync>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("i/o failure: {0}")]
    Io(String),
    #[error(transparent)]
    Codec(#[from] WireError),
}

/// What any concrete byte-stream transport must provide.
pub trait Transport: Send + Sync {
    /// Establish the stream, or fail with a connectivity error.
    fn open(&self, endpoint: &Endpoint)
        -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Release resources. Tolerant of an already-broken stream.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Write one framed command.
    fn send(&self, command: &Command)
        -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Start the inbound-reading task. It runs until the stream closes or
    /// decoding fails, then terminates silently. No automatic reconnect.
    fn subscribe(&self, handler: InboundHandler);
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket-over-TCP transport: one command per binary frame.
///
/// The sink half lives behind a mutex so that overlapping senders are
/// serialized and frames never interleave at the byte level. The stream
/// half is parked between [`Transport::open`] and [`Transport::subscribe`],
/// then moved into the spawned reader task.
pub struct WsTransport {
    sink: Mutex<Option<SplitSink<WsStream, Message>>>,
    stream: std::sync::Mutex<Option<SplitStream<WsStream>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            stream: std::sync::Mutex::new(None),
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    async fn open(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(endpoint.ws_url())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);
        *self.stream.lock().unwrap() = Some(stream);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.stream.lock().unwrap().take();
        match self.sink.lock().await.take() {
            Some(mut sink) => sink
                .close()
                .await
                .map_err(|e| TransportError::Io(e.to_string())),
            None => Ok(()),
        }
    }

    async fn send(&self, command: &Command) -> Result<(), TransportError> {
        let bytes = command.encode()?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn subscribe(&self, handler: InboundHandler) {
        let Some(mut stream) = self.stream.lock().unwrap().take() else {
            log::warn!("subscribe called on a transport with no open stream");
            return;
        };
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Binary(data)) => match Command::decode(&data) {
                        Ok(cmd) => handler(cmd),
                        Err(e) => {
                            log::warn!("dropping connection on undecodable frame: {e}");
                            break;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        log::debug!("inbound stream error: {e}");
                        break;
                    }
                }
            }
            log::debug!("inbound reader task ended");
        });
    }
}
