//! World state management.
//!
//! The single source of truth for every player, bot and food pellet in the
//! current epoch.

use crate::collision::clamp_axis;
use crate::entity::{Bot, Entity, Food, Player};
use glam::Vec2;
use protocol::{Color, EntityView, FoodView};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

/// Handle to a player or bot, used to address contestants without borrowing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKey {
    Player(u32),
    Bot(usize),
}

/// World border bounds. The world spans `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub width: f32,
    pub height: f32,
}

impl WorldBorder {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Get a uniformly random position where a circle of `radius` fits entirely.
    #[inline]
    pub fn random_position(&self, radius: f32) -> Vec2 {
        let mut rng = rand::rng();
        let mut axis = |extent: f32| {
            if 2.0 * radius >= extent {
                extent / 2.0
            } else {
                rng.random_range(radius..=extent - radius)
            }
        };
        let x = axis(self.width);
        let y = axis(self.height);
        Vec2::new(x, y)
    }

    /// Clamp a position so the whole circle stays inside the border.
    #[inline]
    pub fn clamp(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            clamp_axis(position.x, radius, self.width),
            clamp_axis(position.y, radius, self.height),
        )
    }

    /// Whether the whole circle lies inside the border.
    #[cfg(test)]
    pub fn contains(&self, position: Vec2, radius: f32) -> bool {
        self.clamp(position, radius) == position
    }
}

/// Read-only union of players, bots and food at a tick boundary.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Players first (by id), then bots.
    pub players: Vec<EntityView>,
    pub food: Vec<FoodView>,
}

/// Population statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorldCounts {
    pub players: usize,
    pub bots: usize,
    pub food: usize,
}

/// The game world containing all entities.
#[derive(Debug)]
pub struct World {
    /// Next player id to assign. Reset by [`World::clear`].
    next_player_id: u32,
    /// Next food id to assign. Reset by [`World::clear`].
    next_food_id: u32,

    /// Players by id.
    pub players: HashMap<u32, Player>,
    /// Bots, in roster order.
    pub bots: Vec<Bot>,
    /// Food pellets.
    pub food: Vec<Food>,

    /// World border.
    pub border: WorldBorder,
}

impl World {
    /// Create an empty world with the given border size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            next_player_id: 1,
            next_food_id: 1,
            players: HashMap::with_capacity(16),
            bots: Vec::with_capacity(16),
            food: Vec::with_capacity(128),
            border: WorldBorder::new(width, height),
        }
    }

    /// Get the next player id.
    pub fn next_player_id(&mut self) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    fn next_food_id(&mut self) -> u32 {
        let id = self.next_food_id;
        self.next_food_id = self.next_food_id.wrapping_add(1).max(1);
        id
    }

    /// Insert a new player at a random position and return its id.
    pub fn add_player(&mut self, character: String, radius: f32) -> u32 {
        let id = self.next_player_id();
        let position = self.border.random_position(radius);
        self.players.insert(id, Player::new(id, character, position, radius));
        id
    }

    /// Remove a player.
    pub fn remove_player(&mut self, id: u32) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Top food up to `target`. Returns how many pellets were spawned.
    pub fn spawn_food(&mut self, target: usize, radius: f32, colors: &[Color]) -> usize {
        let missing = target.saturating_sub(self.food.len());
        let mut rng = rand::rng();
        for _ in 0..missing {
            let id = self.next_food_id();
            let position = self.border.random_position(radius);
            let color = colors.choose(&mut rng).copied().unwrap_or_default();
            self.food.push(Food::new(id, position, radius, color));
        }
        missing
    }

    /// Drop every entity and restart id allocation.
    pub fn clear(&mut self) {
        self.players.clear();
        self.bots.clear();
        self.food.clear();
        self.next_player_id = 1;
        self.next_food_id = 1;
    }

    /// Players (ascending id) followed by bots.
    pub fn contestants(&self) -> Vec<EntityKey> {
        let mut ids: Vec<u32> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(EntityKey::Player)
            .chain((0..self.bots.len()).map(EntityKey::Bot))
            .collect()
    }

    /// Get a player or bot by key.
    #[inline]
    pub fn entity(&self, key: EntityKey) -> Option<&dyn Entity> {
        match key {
            EntityKey::Player(id) => self.players.get(&id).map(|p| p as &dyn Entity),
            EntityKey::Bot(index) => self.bots.get(index).map(|b| b as &dyn Entity),
        }
    }

    /// Get a mutable player or bot by key.
    #[inline]
    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut dyn Entity> {
        match key {
            EntityKey::Player(id) => self.players.get_mut(&id).map(|p| p as &mut dyn Entity),
            EntityKey::Bot(index) => self.bots.get_mut(index).map(|b| b as &mut dyn Entity),
        }
    }

    /// Every body in the world, food included.
    #[cfg(test)]
    pub fn bodies(&self) -> impl Iterator<Item = &crate::entity::EntityData> {
        self.players
            .values()
            .map(|p| &p.data)
            .chain(self.bots.iter().map(|b| &b.data))
            .chain(self.food.iter().map(|f| &f.data))
    }

    /// Build the serializable view of the current state.
    pub fn snapshot(&self) -> Snapshot {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_unstable_by_key(|p| p.id);
        Snapshot {
            players: players
                .into_iter()
                .map(Player::view)
                .chain(self.bots.iter().map(Bot::view))
                .collect(),
            food: self.food.iter().map(Food::view).collect(),
        }
    }

    #[inline]
    pub fn counts(&self) -> WorldCounts {
        WorldCounts {
            players: self.players.len(),
            bots: self.bots.len(),
            food: self.food.len(),
        }
    }
}
