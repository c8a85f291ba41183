//! Game state and main loop.

use crate::ai::BotDirector;
use crate::config::Config;
use crate::simulation::{self, TickReport};
use crate::world::{World, WorldCounts};
use futures_util::FutureExt;
use glam::Vec2;
use protocol::{ClientMessage, ProtocolError, ServerMessage};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::client::{Client, ConnectionId, Delivery, Frame};

/// Ticks between two performance summaries.
const STATS_INTERVAL: u64 = 300;

/// Point-in-time server statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServerStats {
    pub tick: u64,
    pub connections: usize,
    #[serde(flatten)]
    pub world: WorldCounts,
    /// Average tick duration in milliseconds.
    pub tick_ms: f64,
}

/// Main game state: the world plus every open connection.
pub struct GameState {
    pub config: Config,
    pub tick_count: u64,

    // ID counters
    next_client_id: ConnectionId,

    // Connected clients
    pub clients: HashMap<ConnectionId, Client>,

    // Game world (entities)
    pub world: World,

    // Bot population and steering
    pub director: BotDirector,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl GameState {
    /// Create a new game state with food already in place.
    pub fn new(config: &Config) -> Self {
        let mut world = World::new(config.border.width, config.border.height);
        world.spawn_food(config.food.target_count, config.food.radius, &config.food.colors);

        Self {
            config: config.clone(),
            tick_count: 0,
            next_client_id: 1,
            clients: HashMap::new(),
            world,
            director: BotDirector::new(config.bot.clone()),
            update_time_avg: 0.0,
        }
    }

    /// Register a new connection. The receiver yields frames to write to its socket.
    pub fn add_client(&mut self, addr: SocketAddr) -> (ConnectionId, mpsc::Receiver<Frame>) {
        let id = self.next_client_id;
        self.next_client_id += 1;
        let (tx, rx) = mpsc::channel(self.config.server.send_buffer.max(1));
        self.clients.insert(id, Client::new(id, addr, tx));
        info!("Client {} connected from {}", id, addr);
        (id, rx)
    }

    /// Unregister a connection and remove its player.
    pub fn remove_client(&mut self, id: ConnectionId) {
        let Some(client) = self.clients.remove(&id) else {
            return;
        };
        info!("Client {} ({}) disconnected", id, client.addr);

        if let Some(player_id) = client.player_id {
            if self.world.remove_player(player_id).is_some() {
                info!("Player {} left", player_id);
                self.rebalance_bots();
            }
        }
    }

    /// Handle a text frame from a client.
    ///
    /// Frames that do not decode are returned as errors and change nothing.
    pub fn handle_message(&mut self, client_id: ConnectionId, text: &str) -> Result<(), ProtocolError> {
        if !self.clients.contains_key(&client_id) {
            return Ok(());
        }

        match ClientMessage::parse(text)? {
            ClientMessage::Join { character } => self.handle_join(client_id, character),
            ClientMessage::Move { dx, dy } => self.handle_move(client_id, Vec2::new(dx, dy)),
            ClientMessage::Restart => self.handle_restart(client_id),
        }
        Ok(())
    }

    fn handle_join(&mut self, client_id: ConnectionId, character: String) {
        // A second join replaces the player this connection already has.
        if let Some(old) = self.clients.get(&client_id).and_then(|c| c.player_id) {
            self.world.remove_player(old);
        }

        let player_id = self.world.add_player(character, self.config.player.spawn_radius);
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.player_id = Some(player_id);
        }
        if let Some(player) = self.world.players.get(&player_id) {
            info!("Client {} joined as player {} ({})", client_id, player_id, player.character);
        }

        self.rebalance_bots();

        let snapshot = self.world.snapshot();
        self.send_to(
            client_id,
            &ServerMessage::Init {
                id: player_id,
                food: snapshot.food,
                players: snapshot.players,
            },
        );
    }

    fn handle_move(&mut self, client_id: ConnectionId, input: Vec2) {
        let player = self
            .clients
            .get(&client_id)
            .and_then(|c| c.player_id)
            .and_then(|id| self.world.players.get_mut(&id));
        if let Some(player) = player {
            player.input = input;
        }
    }

    fn handle_restart(&mut self, client_id: ConnectionId) {
        info!("Client {} requested a restart", client_id);
        self.world.clear();
        self.world
            .spawn_food(self.config.food.target_count, self.config.food.radius, &self.config.food.colors);
        for client in self.clients.values_mut() {
            client.player_id = None;
        }
        self.broadcast(&ServerMessage::Restart);
    }

    fn rebalance_bots(&mut self) {
        let change = self.director.rebalance(&mut self.world);
        if change.added > 0 || change.removed > 0 {
            info!(
                "Bots rebalanced: +{} -{}, {} active",
                change.added,
                change.removed,
                self.world.bots.len()
            );
        }
    }

    /// Advance the simulation one tick and send the settled state to everyone.
    pub fn tick(&mut self) -> TickReport {
        self.tick_count += 1;
        let report = simulation::step(&mut self.world, &self.director, &self.config);

        let snapshot = self.world.snapshot();
        self.broadcast(&ServerMessage::State {
            players: snapshot.players,
            food: snapshot.food,
        });
        report
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            tick: self.tick_count,
            connections: self.clients.len(),
            world: self.world.counts(),
            tick_ms: self.update_time_avg,
        }
    }

    fn send_to(&mut self, client_id: ConnectionId, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let delivery = match self.clients.get(&client_id) {
            Some(client) => client.send(&frame),
            None => return,
        };
        match delivery {
            Delivery::Queued => {}
            Delivery::Dropped => debug!("Client {} is lagging, dropped a frame", client_id),
            Delivery::Closed => self.remove_client(client_id),
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let mut closed = Vec::new();
        for client in self.clients.values() {
            match client.send(&frame) {
                Delivery::Queued => {}
                Delivery::Dropped => debug!("Client {} is lagging, dropped a frame", client.id),
                Delivery::Closed => closed.push(client.id),
            }
        }
        for id in closed {
            self.remove_client(id);
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Frame> {
    match message.encode() {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// Run the main game loop.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>, tick_interval: Duration) {
    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let scheduled = ticker.tick().await;

        // Hibernate when no users are connected
        {
            let game = state.read().await;
            if game.config.server.hibernate && game.clients.is_empty() {
                continue;
            }
        }

        // Drain any backlog so one firing never turns into a burst of ticks.
        let mut skipped = 0u32;
        while ticker.tick().now_or_never().is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(
                "Skipped {} ticks to stay current (lag: {:?})",
                skipped,
                Instant::now().saturating_duration_since(scheduled)
            );
        }

        let mut game = state.write().await;
        let tick_start = std::time::Instant::now();
        let report = game.tick();
        let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
        game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

        let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;
        if tick_ms > tick_budget {
            let counts = game.world.counts();
            warn!(
                "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} bots, {} food",
                game.tick_count, tick_ms, tick_budget, counts.players, counts.bots, counts.food
            );
        }

        if game.tick_count % STATS_INTERVAL == 0 {
            let stats = game.stats();
            debug!(
                "Tick #{}: {:.2}ms avg | {} connections, {} players, {} bots, {} food | last tick ate {} food, {} consumptions",
                stats.tick,
                stats.tick_ms,
                stats.connections,
                stats.world.players,
                stats.world.bots,
                stats.world.food,
                report.food_eaten,
                report.consumptions
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use protocol::EntityId;

    fn config(characters: &[&str]) -> Config {
        Config {
            bot: BotConfig {
                characters: characters.iter().map(|c| c.to_string()).collect(),
                ..BotConfig::default()
            },
            ..Config::default()
        }
    }

    fn connect(game: &mut GameState) -> (ConnectionId, mpsc::Receiver<Frame>) {
        game.add_client("127.0.0.1:5000".parse().unwrap())
    }

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(ServerMessage::parse(&frame).unwrap());
        }
        out
    }

    fn join(game: &mut GameState, id: ConnectionId, character: &str) {
        let text = ClientMessage::Join { character: character.into() }.encode().unwrap();
        game.handle_message(id, &text).unwrap();
    }

    #[test]
    fn test_join_replies_with_init_to_joiner_only() {
        let mut game = GameState::new(&config(&["A", "B", "C"]));
        let (first, mut first_rx) = connect(&mut game);
        let (second, mut second_rx) = connect(&mut game);

        join(&mut game, first, "A");
        join(&mut game, second, "B");

        let first_msgs = drain(&mut first_rx);
        assert_eq!(first_msgs.len(), 1);

        match drain(&mut second_rx).as_slice() {
            [ServerMessage::Init { id, food, players }] => {
                assert_eq!(*id, 2);
                assert_eq!(food.len(), 100);
                let humans = players.iter().filter(|p| !p.is_bot).count();
                let bots: Vec<_> = players.iter().filter(|p| p.is_bot).map(|p| p.id.clone()).collect();
                assert_eq!(humans, 2);
                assert_eq!(bots, vec![EntityId::Bot("bot_C".into())]);
            }
            other => panic!("unexpected messages {other:?}"),
        }
    }

    #[test]
    fn test_move_before_join_is_ignored() {
        let mut game = GameState::new(&config(&["A"]));
        let (id, _rx) = connect(&mut game);
        game.handle_message(id, r#"{"type":"move","dx":1,"dy":0}"#).unwrap();
        assert!(game.world.players.is_empty());
    }

    #[test]
    fn test_move_stores_raw_input_without_moving() {
        let mut game = GameState::new(&config(&["A"]));
        let (id, _rx) = connect(&mut game);
        join(&mut game, id, "A");
        let before = game.world.players[&1].data.position;

        game.handle_message(id, r#"{"type":"move","dx":10,"dy":-4}"#).unwrap();
        assert_eq!(game.world.players[&1].input, Vec2::new(10.0, -4.0));
        assert_eq!(game.world.players[&1].data.position, before);

        game.handle_message(id, r#"{"type":"move","dx":0,"dy":0}"#).unwrap();
        assert_eq!(game.world.players[&1].input, Vec2::ZERO);
    }

    #[test]
    fn test_malformed_messages_change_nothing() {
        let mut game = GameState::new(&config(&["A"]));
        let (id, mut rx) = connect(&mut game);

        assert!(game.handle_message(id, "{").is_err());
        assert!(game.handle_message(id, r#"{"type":"dance"}"#).is_err());
        assert!(game.clients.contains_key(&id));
        assert!(game.world.players.is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_disconnect_removes_player_and_frees_character() {
        let mut game = GameState::new(&config(&["A", "B"]));
        let (first, _first_rx) = connect(&mut game);
        let (second, _second_rx) = connect(&mut game);
        join(&mut game, first, "A");
        join(&mut game, second, "B");
        assert!(game.world.bots.is_empty());

        game.remove_client(first);
        assert!(!game.world.players.contains_key(&1));
        assert_eq!(game.world.bots.len(), 1);
        assert_eq!(game.world.bots[0].character, "A");

        game.tick();
        let snapshot = game.world.snapshot();
        assert!(!snapshot.players.iter().any(|p| p.id == EntityId::Player(1)));
    }

    #[test]
    fn test_restart_clears_world_and_notifies_everyone() {
        let mut game = GameState::new(&config(&["A", "B"]));
        let (first, mut first_rx) = connect(&mut game);
        let (second, mut second_rx) = connect(&mut game);
        join(&mut game, first, "A");
        drain(&mut first_rx);

        game.handle_message(second, r#"{"type":"restart"}"#).unwrap();
        assert_eq!(drain(&mut first_rx), vec![ServerMessage::Restart]);
        assert_eq!(drain(&mut second_rx), vec![ServerMessage::Restart]);

        let counts = game.world.counts();
        assert_eq!((counts.players, counts.bots, counts.food), (0, 0, 100));
        assert!(game.clients.values().all(|c| c.player_id.is_none()));

        join(&mut game, second, "B");
        assert_eq!(game.clients[&second].player_id, Some(1));
    }

    #[test]
    fn test_stale_binding_cannot_steer_new_epoch() {
        let mut game = GameState::new(&config(&["A", "B"]));
        let (first, _first_rx) = connect(&mut game);
        let (second, _second_rx) = connect(&mut game);
        join(&mut game, first, "A");
        game.handle_message(first, r#"{"type":"restart"}"#).unwrap();
        join(&mut game, second, "B");

        game.handle_message(first, r#"{"type":"move","dx":1,"dy":0}"#).unwrap();
        assert_eq!(game.world.players[&1].input, Vec2::ZERO);
    }

    #[test]
    fn test_rejoin_replaces_player() {
        let mut game = GameState::new(&config(&["A", "B"]));
        let (id, _rx) = connect(&mut game);
        join(&mut game, id, "A");
        join(&mut game, id, "B");

        assert_eq!(game.world.players.len(), 1);
        assert_eq!(game.clients[&id].player_id, Some(2));
        assert_eq!(game.world.bots.len(), 1);
        assert_eq!(game.world.bots[0].character, "A");
    }

    #[test]
    fn test_tick_broadcasts_state_and_drops_closed_clients() {
        let mut game = GameState::new(&config(&["A", "B"]));
        let (first, mut first_rx) = connect(&mut game);
        let (second, second_rx) = connect(&mut game);
        join(&mut game, first, "A");
        join(&mut game, second, "B");
        drain(&mut first_rx);
        drop(second_rx);

        game.tick();
        assert!(!game.clients.contains_key(&second));
        assert!(!game.world.players.contains_key(&2));
        assert_eq!(game.world.bots.len(), 1);

        // The snapshot was settled before the dead connection was noticed.
        match drain(&mut first_rx).as_slice() {
            [ServerMessage::State { players, food }] => {
                assert_eq!(players.iter().filter(|p| !p.is_bot).count(), 2);
                assert_eq!(food.len(), 100);
            }
            other => panic!("unexpected messages {other:?}"),
        }
    }

    #[test]
    fn test_player_moves_right_over_ticks() {
        let mut game = GameState::new(&config(&["A"]));
        let (id, _rx) = connect(&mut game);
        join(&mut game, id, "A");
        game.world.players.get_mut(&1).unwrap().data.position = Vec2::new(300.0, 500.0);
        game.handle_message(id, r#"{"type":"move","dx":1,"dy":0}"#).unwrap();

        for _ in 0..10 {
            game.tick();
        }
        let position = game.world.players[&1].data.position;
        assert!(position.x > 300.0);
        assert_eq!(position.y, 500.0);
    }

    #[test]
    fn test_slow_client_frames_are_dropped_not_queued() {
        let mut config = config(&["A"]);
        config.server.send_buffer = 2;
        let mut game = GameState::new(&config);
        let (_id, mut rx) = connect(&mut game);

        for _ in 0..5 {
            game.tick();
        }
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(game.clients.len(), 1);
    }
}
