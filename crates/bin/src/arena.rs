//! Arena - game server behind an HTTP router.
//!
//! Serves the game WebSocket on `/` and `/game`, plus a `/health` probe.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use protocol::ProtocolError;
use server::SharedGame;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Arena Server v{}", env!("CARGO_PKG_VERSION"));

    // Load server configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Border: {}x{}", config.border.width, config.border.height);
    info!("  Tick rate: {}/s", config.server.tick_rate);
    info!("  Bots: {}", config.bot.characters.join(", "));

    let game = server::start(&config);

    // Build the axum router
    let app = Router::new()
        .route("/", get(websocket_handler))
        .route("/game", get(websocket_handler))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(game);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.server.bind, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/game", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Liveness probe with population counts.
async fn health(State(game): State<SharedGame>) -> impl IntoResponse {
    let stats = game.read().await.stats();
    Json(serde_json::json!({ "status": "ok", "stats": stats }))
}

/// Handle WebSocket upgrades for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(game): State<SharedGame>,
) -> impl IntoResponse {
    debug!("WebSocket upgrade from {}", addr);
    ws.on_upgrade(move |socket| handle_socket(socket, addr, game))
}

/// Bridge an axum WebSocket to the game session.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, game: SharedGame) {
    let (mut write, mut read) = socket.split();
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
                let Some(frame) = frame else { break };
                if let Err(e) = write.send(Message::Text(frame.to_string().into())).await {
                    warn!("Failed to send to {}: {}", addr, e);
                    break;
                }
            }
        }
    }

    game.write().await.remove_client(client_id);
}
