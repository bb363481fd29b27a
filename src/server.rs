//! TCP transport adapter: accepts connections, drives the handshake, then hands the stream
//! off to the room's session spawn function. QUIC and WebSocket adapters are out of scope and
//! would plug in at the same point, against the same `ByteStream` (`AsyncRead + AsyncWrite`)
//! contract this module uses.

use std::sync::Arc;

use anyhow::Context;
use service::{admit, Error, RelayHook, RoomRegistry};
use tokio::net::TcpListener;

use crate::config::Config;

/// Builds the room registry from `config.rooms` and runs the accept loop until the listener
/// errors. Each accepted connection runs the handshake; success spawns a session on the resolved
/// room, failure closes the connection without touching any room state.
pub async fn run(config: Arc<Config>) -> anyhow::Result<()> {
    let rooms: Arc<RoomRegistry<RelayHook>> = Arc::new(RoomRegistry::new());
    for spec in &config.rooms {
        rooms
            .create(spec.id, spec.into(), RelayHook)
            .map_err(|e| anyhow::anyhow!("duplicate room id {}: {e}", spec.id))?;
    }
    log::info!("pre-created {} room(s) from configuration", rooms.len());

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    log::info!("listening on {}", config.listen);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                log::error!("accept failed: {e}");
                continue;
            }
        };

        let rooms = rooms.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, rooms).await {
                log::info!("rejected connection from {peer}: {e}");
            }
        });
    }
}

async fn handle_connection(
    mut socket: tokio::net::TcpStream,
    rooms: Arc<RoomRegistry<RelayHook>>,
) -> Result<(), Error> {
    let (_admission, room) = admit(&mut socket, |id| rooms.get(id)).await?;

    let (session, receiver) = room.register().await?;
    let id = session.id();
    log::info!("room {}: client {id} connected", room.id());
    service::spawn_session(socket, id, session, receiver, room);

    Ok(())
}
