//! Game server implementation.

use crate::config::Config;
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use protocol::ProtocolError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

pub mod client;
pub mod game;

pub use client::{Client, ConnectionId, Delivery, Frame};
pub use game::{run_game_loop, GameState, ServerStats};

/// Game state shared between the tick loop and every connection task.
pub type SharedGame = Arc<RwLock<GameState>>;

/// Create the game state and start its tick loop on the current runtime.
pub fn start(config: &Config) -> SharedGame {
    let game = Arc::new(RwLock::new(GameState::new(config)));
    let tick_interval = config.server.tick_interval();
    tokio::spawn(run_game_loop(Arc::clone(&game), tick_interval));
    info!(
        "World initialized: {}x{}, {} food, {} ticks/s",
        config.border.width, config.border.height, config.food.target_count, config.server.tick_rate
    );
    game
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.server.bind, config.server.port))?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on ws://{}", addr);

    let game = start(&config);
    serve(listener, game).await
}

/// Accept WebSocket connections on `listener` forever.
pub async fn serve(listener: TcpListener, game: SharedGame) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let game = Arc::clone(&game);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, game).await {
                warn!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, game: SharedGame) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let (client_id, mut outbound) = game.write().await.add_client(addr);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let mut state = game.write().await;
                        if let Err(e) = state.handle_message(client_id, text.as_str()) {
                            debug!("Ignoring message from {}: {}", addr, e);
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring message from {}: {}", addr, ProtocolError::NonText);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }
            frame = outbound.recv() => {
                // None means the game already unregistered this connection.
                let Some(frame) = frame else { break };
                if let Err(e) = write.send(Message::text(frame.to_string())).await {
                    warn!("Failed to send to {}: {}", addr, e);
                    break;
                }
            }
        }
    }

    game.write().await.remove_client(client_id);
    Ok(())
}
