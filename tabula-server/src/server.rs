//! The domain layer: command routing and game-state broadcasts.
//!
//! [`GameServer`] never touches sockets. It owns the [`CommandServer`]
//! transport, the [`Game`] roster and the [`Board`], and registers an
//! executor that matches every command kind exhaustively; adding a kind
//! extends the match at compile time instead of hitting a runtime
//! default branch.

use std::sync::Arc;

use tabula_protocol::{
    version, Ack, ClientInfo, Command, CommandId, CommandKind, JoinStatus, LeaveStatus, Pack,
    Reply, ReplyStatus,
};

use crate::game::{Board, Game, Player};
use crate::net::{ClientHandle, CommandServer, ServerError};
use crate::snapshot::{SnapshotBuilder, StateSource};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct GameServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
}

impl Default for GameServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:1313".to_string(),
        }
    }
}

/// Derives the player identity a connection gets on join.
///
/// Must be deterministic per connection: joining twice on one connection
/// derives the same id, which is what makes the duplicate observable.
pub type IdentityStrategy = dyn Fn(&ClientHandle) -> String + Send + Sync;

fn default_identity(client: &ClientHandle) -> String {
    let hex = client.conn_id().as_simple().to_string();
    hex[..8].to_string()
}

/// High-level game server: transport plus game logic.
pub struct GameServer {
    net: Arc<CommandServer>,
    game: Arc<Game>,
}

impl GameServer {
    /// Create a server with the default identity strategy (a short hex
    /// tag derived from the connection id).
    pub fn new(config: GameServerConfig) -> Self {
        Self::with_identity_strategy(config, default_identity)
    }

    /// Create a server with a custom player-identity strategy.
    pub fn with_identity_strategy(
        config: GameServerConfig,
        identity: impl Fn(&ClientHandle) -> String + Send + Sync + 'static,
    ) -> Self {
        let net = Arc::new(CommandServer::new(config.bind_addr));
        let game = Arc::new(Game::new());
        let board = Arc::new(Board::new());

        // Composition root for snapshot contributors: the roster and the
        // board each append their own fragments, the builder stays
        // ignorant of both.
        let snapshots = SnapshotBuilder::new(vec![
            game.clone() as Arc<dyn StateSource>,
            board as Arc<dyn StateSource>,
        ]);

        let router = Router {
            net: net.clone(),
            game: game.clone(),
            snapshots,
            identity: Box::new(identity),
        };
        net.on_command(move |client, command| router.route(client, command));

        Self { net, game }
    }

    /// Start the game session and accept connections. Blocks for the
    /// lifetime of the server.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.game.start();
        self.net.run().await
    }

    /// The underlying transport, for pushing commands from server logic.
    pub fn net(&self) -> &Arc<CommandServer> {
        &self.net
    }

    pub fn game(&self) -> &Arc<Game> {
        &self.game
    }
}

/// Maps each inbound command to its handler.
struct Router {
    net: Arc<CommandServer>,
    game: Arc<Game>,
    snapshots: SnapshotBuilder,
    identity: Box<IdentityStrategy>,
}

impl Router {
    fn route(&self, client: &Arc<ClientHandle>, command: Command) -> Ack {
        let id = command.id;
        match command.kind {
            CommandKind::Handshake { version } => handshake_ack(id, &version),
            CommandKind::Echo { message } => Ack::new(
                id,
                Reply::Echo {
                    status: ReplyStatus::Ok,
                    message,
                },
            ),
            CommandKind::JoinGame { player } => self.join(client, id, player),
            CommandKind::LeaveGame => self.leave(client, id),
            CommandKind::GetInfo => self.get_info(client, id),
            CommandKind::UpdateState(_) | CommandKind::Ack { .. } => {
                log::error!("unexpected command {id} from client {}", client.addr());
                Ack::none(id)
            }
        }
    }

    /// Register the requester as a player. On success the joiner gets an
    /// after-join snapshot and everyone gets the refreshed roster.
    fn join(&self, client: &Arc<ClientHandle>, id: CommandId, player: String) -> Ack {
        let client_id = (self.identity)(client);
        let status = self.game.add_player(&client_id, Player::new(player));
        if status == JoinStatus::Ok {
            client.assign_player_id(&client_id);
            self.net
                .send_to_client(client, self.snapshots.build(Pack::AfterJoinGame));
            self.net.broadcast(self.snapshots.build(Pack::PlayersList));
        }
        Ack::new(id, Reply::Join { status, client_id })
    }

    fn leave(&self, client: &Arc<ClientHandle>, id: CommandId) -> Ack {
        let status = self.game.remove_player(&client.player_id());
        if status == LeaveStatus::Ok {
            self.net.broadcast(self.snapshots.build(Pack::PlayersList));
        }
        Ack::new(id, Reply::Leave { status })
    }

    fn get_info(&self, client: &Arc<ClientHandle>, id: CommandId) -> Ack {
        let player_id = client.player_id();
        if player_id.is_empty() {
            return Ack::new(
                id,
                Reply::Info {
                    status: ReplyStatus::ClientNotFound,
                    info: ClientInfo::empty(),
                },
            );
        }
        Ack::new(
            id,
            Reply::Info {
                status: ReplyStatus::Ok,
                info: ClientInfo {
                    client_id: player_id,
                    game_started_at_ms: self.game.started_at_ms(),
                    connected_at_ms: client.connected_at_ms(),
                },
            },
        )
    }
}

fn handshake_ack(id: CommandId, announced: &str) -> Ack {
    Ack::new(
        id,
        Reply::Handshake {
            status: version::check(announced),
        },
    )
}
