//! Connection acceptor and per-connection dispatch.
//!
//! The transport layer of the server: it accepts socket connections,
//! frames commands over WebSocket, and routes every inbound command to a
//! registered executor. It does not interpret commands itself.
//!
//! Threading model:
//! - the accept loop blocks on the listener and spawns one handling task
//!   per accepted connection,
//! - each handling task reads exactly one command per frame and writes
//!   the executor's acknowledgment back,
//! - pushes ([`CommandServer::send_to_client`],
//!   [`CommandServer::broadcast`]) spawn short-lived tasks of their own.
//!
//! All writes to one connection go through that connection's sink mutex,
//! so a handling-task acknowledgment and a concurrent push can never
//! interleave bytes on the wire.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

use tabula_protocol::{Ack, Command, WireError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error(transparent)]
    Codec(#[from] WireError),
}

/// Executor turning one inbound command into an acknowledgment.
///
/// Invoked concurrently from multiple handling tasks; must not panic.
pub type Executor = dyn Fn(&Arc<ClientHandle>, Command) -> Ack + Send + Sync;

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Server-side record of one accepted connection.
///
/// Owned by its handling task; push callers hold `Arc` references. The
/// sink mutex is the connection's write permit: every outbound frame is
/// written while holding it.
pub struct ClientHandle {
    conn_id: Uuid,
    addr: SocketAddr,
    sink: Mutex<WsSink>,
    /// Player identity, empty until a successful join.
    player_id: RwLock<String>,
    connected_at_ms: u64,
}

impl ClientHandle {
    fn new(sink: WsSink, addr: SocketAddr) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            addr,
            sink: Mutex::new(sink),
            player_id: RwLock::new(String::new()),
            connected_at_ms: now_ms(),
        }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn player_id(&self) -> String {
        self.player_id.read().unwrap().clone()
    }

    pub fn assign_player_id(&self, id: &str) {
        *self.player_id.write().unwrap() = id.to_string();
    }

    pub fn connected_at_ms(&self) -> u64 {
        self.connected_at_ms
    }

    /// Write one framed command while holding the write permit.
    pub(crate) async fn write(&self, command: &Command) -> Result<(), ServerError> {
        let bytes = command.encode()?;
        let mut sink = self.sink.lock().await;
        sink.send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| ServerError::Write(e.to_string()))
    }
}

type ClientMap = Arc<RwLock<HashMap<Uuid, Arc<ClientHandle>>>>;

/// Accepts connections and dispatches their command traffic.
pub struct CommandServer {
    bind_addr: String,
    clients: ClientMap,
    executor: Arc<RwLock<Arc<Executor>>>,
}

impl CommandServer {
    /// Create a server for the given bind address. Until an executor is
    /// registered, every inbound command is answered with the no-ack
    /// sentinel.
    pub fn new(bind_addr: impl Into<String>) -> Self {
        let no_executor: Arc<Executor> =
            Arc::new(|_: &Arc<ClientHandle>, cmd: Command| Ack::none(cmd.id));
        Self {
            bind_addr: bind_addr.into(),
            clients: Arc::new(RwLock::new(HashMap::new())),
            executor: Arc::new(RwLock::new(no_executor)),
        }
    }

    /// Register the executor invoked for every inbound command.
    pub fn on_command<F>(&self, executor: F)
    where
        F: Fn(&Arc<ClientHandle>, Command) -> Ack + Send + Sync + 'static,
    {
        *self.executor.write().unwrap() = Arc::new(executor);
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    /// Look up a connection by its handle id.
    pub fn client(&self, conn_id: Uuid) -> Option<Arc<ClientHandle>> {
        self.clients.read().unwrap().get(&conn_id).cloned()
    }

    /// All currently connected clients.
    pub fn clients(&self) -> Vec<Arc<ClientHandle>> {
        self.clients.read().unwrap().values().cloned().collect()
    }

    /// Accept connections until the task is dropped.
    ///
    /// One failed accept does not stop the server: the error is logged
    /// and the loop continues.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        log::info!("server started on {}", self.bind_addr);
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let clients = self.clients.clone();
                    let executor = self.executor.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(stream, addr, clients, executor).await
                        {
                            log::warn!("connection from {addr} ended: {e}");
                        }
                    });
                }
                Err(e) => {
                    log::error!("failed to accept connection: {e}");
                }
            }
        }
    }

    /// Handle all traffic of a single connection.
    ///
    /// Reads one command per frame, runs the executor, writes the
    /// acknowledgment back under the write permit. Any read or write
    /// failure is treated as a disconnect: the record is removed and the
    /// task ends without touching sibling connections.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        clients: ClientMap,
        executor: Arc<RwLock<Arc<Executor>>>,
    ) -> Result<(), ServerError> {
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| ServerError::Handshake(e.to_string()))?;
        let (sink, mut reader) = ws.split();

        let handle = Arc::new(ClientHandle::new(sink, addr));
        clients
            .write()
            .unwrap()
            .insert(handle.conn_id(), handle.clone());
        log::info!("accepted connection from {addr}");

        while let Some(msg) = reader.next().await {
            match msg {
                Ok(Message::Binary(data)) => match Command::decode(&data) {
                    Ok(req) => {
                        log::debug!("req: {req:?}");
                        let ack = {
                            let exec = executor.read().unwrap().clone();
                            exec(&handle, req)
                        };
                        let res = ack.into_command();
                        if let Err(e) = handle.write(&res).await {
                            log::warn!("client {addr} disconnected: {e}");
                            break;
                        }
                        log::debug!("res: {res:?}");
                    }
                    Err(e) => {
                        log::warn!("undecodable frame from {addr}: {e}");
                        break;
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("client {addr} read failed: {e}");
                    break;
                }
            }
        }

        clients.write().unwrap().remove(&handle.conn_id());
        log::info!("client {addr} disconnected");
        Ok(())
    }

    /// Push a command to one client from an independent task.
    ///
    /// Best effort: a push to a dead connection is logged and swallowed,
    /// never surfaced to the caller.
    pub fn send_to_client(&self, client: &Arc<ClientHandle>, command: Command) {
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.write(&command).await {
                log::debug!("push to {} failed: {e}", client.addr());
            }
        });
    }

    /// Push a command to every client currently in the active set.
    ///
    /// Each delivery is an independent task; a connection added while the
    /// broadcast is in flight may or may not receive this message.
    pub fn broadcast(&self, command: Command) {
        let targets = self.clients();
        for client in targets {
            self.send_to_client(&client, command.clone());
        }
    }
}
