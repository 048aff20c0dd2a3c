//! Server binary: parse flags, init logging, run the game server.

use clap::Parser;

use tabula_server::{GameServer, GameServerConfig};

#[derive(Parser, Debug)]
#[command(name = "tabula-server", about = "Game server for the tabula command protocol")]
struct Args {
    /// TCP port to listen on.
    #[arg(short, long, default_value_t = 1313)]
    port: u16,

    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = GameServerConfig {
        bind_addr: format!("{}:{}", args.bind, args.port),
    };
    let server = GameServer::new(config);
    if let Err(e) = server.run().await {
        log::error!("server failed: {e}");
        std::process::exit(1);
    }
}
