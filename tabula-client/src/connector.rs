//! The client-side connector.
//!
//! Owns the connection state, the last-operation status mailbox and the
//! pending-response correlation table. All inbound routing happens on the
//! transport's reader task: a command whose id matches a pending entry is
//! delivered to that entry's one-shot handler (removed atomically); any
//! other command goes to the replaceable general handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tabula_protocol::{Command, CommandId};

use crate::endpoint::{Endpoint, EndpointError};
use crate::transport::{Transport, TransportError};

/// One-shot handler for a correlated reply.
pub type ReplyHandler = Box<dyn FnOnce(Command) + Send>;

/// Handler for server-initiated commands (no matching pending entry).
pub type ServerCommandHandler = Arc<dyn Fn(Command) + Send + Sync>;

const STATUS_NONE: u8 = 0;
const STATUS_OK: u8 = 1;
const STATUS_ERROR: u8 = 2;

/// Tri-state last-operation status with atomic read-and-clear.
///
/// A single slot, not a queue: an unconsumed status is overwritten by the
/// next operation, and the compare-and-swap consume guarantees that for
/// one operation at most one of the success/failure observers fires.
struct StatusCell(AtomicU8);

impl StatusCell {
    fn new() -> Self {
        Self(AtomicU8::new(STATUS_NONE))
    }

    fn set(&self, status: u8) {
        self.0.store(status, Ordering::Release);
    }

    /// Consume the slot if it currently holds `expected`.
    fn take(&self, expected: u8) -> bool {
        self.0
            .compare_exchange(expected, STATUS_NONE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Client-side façade managing one logical connection and its command
/// correlation.
///
/// Generic over the [`Transport`] so game code runs over TCP while tests
/// drive an in-memory stub. Operations record their outcome in the status
/// mailbox; callers observe it through [`on_success`](Self::on_success) /
/// [`on_failure`](Self::on_failure) and may chain:
///
/// ```ignore
/// connector.connect().await.on_success(|| log::info!("in"));
/// ```
pub struct GameConnector<T: Transport> {
    endpoint: Endpoint,
    transport: T,
    connected: AtomicBool,
    status: StatusCell,
    pending: Arc<Mutex<HashMap<CommandId, ReplyHandler>>>,
    server_handler: Arc<RwLock<ServerCommandHandler>>,
}

impl<T: Transport> GameConnector<T> {
    /// Create a connector for the given connection string.
    ///
    /// Fails fast on a malformed string, before any network activity.
    pub fn new(conn_str: &str, transport: T) -> Result<Self, EndpointError> {
        let noop: ServerCommandHandler = Arc::new(|_| {});
        Ok(Self {
            endpoint: Endpoint::parse(conn_str)?,
            transport,
            connected: AtomicBool::new(false),
            status: StatusCell::new(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            server_handler: Arc::new(RwLock::new(noop)),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Open the transport and start routing inbound commands.
    ///
    /// On failure nothing propagates: the connector stays disconnected
    /// and the failure is observable via [`on_failure`](Self::on_failure).
    pub async fn connect(&self) -> &Self {
        match self.transport.open(&self.endpoint).await {
            Ok(()) => {
                let pending = self.pending.clone();
                let general = self.server_handler.clone();
                self.transport.subscribe(Arc::new(move |cmd: Command| {
                    let matched = pending.lock().unwrap().remove(&cmd.id);
                    match matched {
                        Some(handler) => handler(cmd),
                        None => {
                            let handler = general.read().unwrap().clone();
                            handler(cmd);
                        }
                    }
                }));
                self.connected.store(true, Ordering::Release);
                self.status.set(STATUS_OK);
            }
            Err(e) => {
                log::warn!("connect to {} failed: {e}", self.endpoint);
                self.connected.store(false, Ordering::Release);
                self.status.set(STATUS_ERROR);
            }
        }
        self
    }

    /// Close the transport. The connector ends up disconnected either
    /// way; only the status reflects whether the close itself was clean.
    pub async fn disconnect(&self) -> &Self {
        match self.transport.close().await {
            Ok(()) => self.status.set(STATUS_OK),
            Err(e) => {
                log::warn!("disconnect from {} failed: {e}", self.endpoint);
                self.status.set(STATUS_ERROR);
            }
        }
        self.connected.store(false, Ordering::Release);
        self
    }

    /// Send a command without expecting a response.
    ///
    /// The one send variant whose failure the caller must handle inline:
    /// the error is returned as well as recorded in the status mailbox.
    pub async fn send(&self, command: Command) -> Result<(), TransportError> {
        match self.transport.send(&command).await {
            Ok(()) => {
                self.status.set(STATUS_OK);
                Ok(())
            }
            Err(e) => {
                self.status.set(STATUS_ERROR);
                Err(e)
            }
        }
    }

    /// Send a command and register a one-shot handler for its reply.
    ///
    /// The handler is installed only after the send succeeded, so a
    /// failed send never leaves an orphaned pending entry. An entry whose
    /// reply never arrives is kept until the process ends; there is no
    /// expiry.
    pub async fn send_with_reply(
        &self,
        command: Command,
        on_reply: impl FnOnce(Command) + Send + 'static,
    ) -> Result<(), TransportError> {
        let id = command.id;
        self.send(command).await?;
        self.pending.lock().unwrap().insert(id, Box::new(on_reply));
        Ok(())
    }

    /// Replace the general handler for server-initiated commands.
    pub fn on_command_from_server(
        &self,
        handler: impl Fn(Command) + Send + Sync + 'static,
    ) -> &Self {
        *self.server_handler.write().unwrap() = Arc::new(handler);
        self
    }

    /// Run `action` if the last operation succeeded, consuming the
    /// status. A no-op otherwise; never fires twice for one operation.
    pub fn on_success(&self, action: impl FnOnce()) -> &Self {
        if self.status.take(STATUS_OK) {
            action();
        }
        self
    }

    /// Run `action` if the last operation failed, consuming the status.
    pub fn on_failure(&self, action: impl FnOnce()) -> &Self {
        if self.status.take(STATUS_ERROR) {
            action();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InboundHandler;
    use std::sync::atomic::AtomicUsize;
    use tabula_protocol::{Ack, CommandKind, Reply, ReplyStatus};

    /// In-memory transport: records sends, lets tests inject inbound
    /// commands through the registered handler.
    #[derive(Default)]
    struct StubTransport {
        fail_open: bool,
        fail_send: bool,
        sent: Mutex<Vec<Command>>,
        handler: Mutex<Option<InboundHandler>>,
    }

    impl StubTransport {
        fn failing_open() -> Self {
            Self {
                fail_open: true,
                ..Self::default()
            }
        }

        fn failing_send() -> Self {
            Self {
                fail_send: true,
                ..Self::default()
            }
        }

        fn inject(&self, cmd: Command) {
            let handler = self
                .handler
                .lock()
                .unwrap()
                .clone()
                .expect("no inbound handler registered");
            handler(cmd);
        }
    }

    impl Transport for StubTransport {
        async fn open(&self, _endpoint: &Endpoint) -> Result<(), TransportError> {
            if self.fail_open {
                return Err(TransportError::Connect("refused".into()));
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send(&self, command: &Command) -> Result<(), TransportError> {
            if self.fail_send {
                return Err(TransportError::Io("broken pipe".into()));
            }
            self.sent.lock().unwrap().push(command.clone());
            Ok(())
        }

        fn subscribe(&self, handler: InboundHandler) {
            *self.handler.lock().unwrap() = Some(handler);
        }
    }

    fn connector(transport: StubTransport) -> GameConnector<StubTransport> {
        GameConnector::new("tcp://localhost:1313", transport).unwrap()
    }

    fn ok_ack(id: CommandId) -> Command {
        Ack::new(
            id,
            Reply::Echo {
                status: ReplyStatus::Ok,
                message: "hi".into(),
            },
        )
        .into_command()
    }

    #[test]
    fn test_invalid_conn_str_fails_fast() {
        assert!(GameConnector::new("nonsense", StubTransport::default()).is_err());
        assert!(GameConnector::new("tcp://localhost:0", StubTransport::default()).is_err());
    }

    #[tokio::test]
    async fn test_connect_success_sets_state_and_status() {
        let conn = connector(StubTransport::default());
        assert!(!conn.is_connected());

        conn.connect().await;
        assert!(conn.is_connected());

        let fired = AtomicUsize::new(0);
        conn.on_failure(|| panic!("must not fire"))
            .on_success(|| {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        // Status was consumed: a second observation is a no-op.
        conn.on_success(|| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_observed_not_thrown() {
        let conn = connector(StubTransport::failing_open());
        conn.connect().await;

        assert!(!conn.is_connected());
        let failed = AtomicBool::new(false);
        conn.on_success(|| panic!("must not fire")).on_failure(|| {
            failed.store(true, Ordering::SeqCst);
        });
        assert!(failed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_disconnect_always_leaves_disconnected() {
        let conn = connector(StubTransport::default());
        conn.connect().await;
        assert!(conn.is_connected());

        conn.disconnect().await;
        assert!(!conn.is_connected());
        let ok = AtomicBool::new(false);
        conn.on_success(|| {
            ok.store(true, Ordering::SeqCst);
        });
        assert!(ok.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_send_failure_propagates_and_sets_status() {
        let conn = connector(StubTransport::failing_send());
        conn.connect().await;
        conn.on_success(|| {}); // drain the connect status

        let result = conn.send(Command::echo("ping")).await;
        assert!(result.is_err());

        let failed = AtomicBool::new(false);
        conn.on_failure(|| {
            failed.store(true, Ordering::SeqCst);
        });
        assert!(failed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_send_installs_no_pending_entry() {
        let conn = connector(StubTransport::failing_send());
        conn.connect().await;

        let cmd = Command::echo("ping");
        let id = cmd.id;
        let result = conn.send_with_reply(cmd, |_| panic!("must never fire")).await;
        assert!(result.is_err());

        // A late reply with that id falls through to the general handler.
        let fallthrough = Arc::new(AtomicBool::new(false));
        let seen = fallthrough.clone();
        conn.on_command_from_server(move |_| {
            seen.store(true, Ordering::SeqCst);
        });
        conn.transport.inject(ok_ack(id));
        assert!(fallthrough.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_reply_dispatched_exactly_once() {
        let conn = connector(StubTransport::default());
        conn.connect().await;

        let hits = Arc::new(AtomicUsize::new(0));
        let general_hits = Arc::new(AtomicUsize::new(0));

        let seen = general_hits.clone();
        conn.on_command_from_server(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let cmd = Command::echo("ping");
        let id = cmd.id;
        let counted = hits.clone();
        conn.send_with_reply(cmd, move |reply| {
            assert_eq!(reply.id, id);
            counted.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

        conn.transport.inject(ok_ack(id));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(general_hits.load(Ordering::SeqCst), 0);

        // Duplicate delivery: the entry is gone, the general handler
        // takes it instead.
        conn.transport.inject(ok_ack(id));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(general_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unmatched_inbound_goes_to_general_handler() {
        let conn = connector(StubTransport::default());
        conn.connect().await;

        // Default handler is a no-op: an unmatched push must not panic.
        conn.transport.inject(Command::echo("unsolicited"));

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        conn.on_command_from_server(move |cmd| {
            *sink.lock().unwrap() = Some(cmd);
        });
        conn.transport.inject(Command::echo("push"));

        let received = seen.lock().unwrap().take().unwrap();
        assert!(matches!(received.kind, CommandKind::Echo { ref message } if message == "push"));
    }

    #[tokio::test]
    async fn test_statuses_overwrite_single_slot() {
        let conn = connector(StubTransport::failing_send());
        conn.connect().await; // OK, left unconsumed
        let _ = conn.send(Command::echo("x")).await; // overwrites with ERROR

        let ok = AtomicBool::new(false);
        let failed = AtomicBool::new(false);
        conn.on_success(|| {
            ok.store(true, Ordering::SeqCst);
        })
        .on_failure(|| {
            failed.store(true, Ordering::SeqCst);
        });
        assert!(!ok.load(Ordering::SeqCst));
        assert!(failed.load(Ordering::SeqCst));
    }
}
