//! Base body type and common functionality.

use glam::Vec2;

/// Contestant category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Bot,
}

/// Body data shared by all entity categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityData {
    /// Center in world coordinates.
    pub position: Vec2,
    /// Always strictly positive.
    pub radius: f32,
    /// Consumption count since the last respawn.
    pub score: u32,
}

impl EntityData {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            radius,
            score: 0,
        }
    }

    /// Called when this entity eats a food pellet.
    #[inline]
    pub fn on_eat_food(&mut self, growth: f32) {
        self.radius += growth;
        self.score += 1;
    }

    /// Called when this entity eats a player or bot of radius `other_radius`.
    #[inline]
    pub fn on_eat(&mut self, other_radius: f32, growth_fraction: f32) {
        self.radius += other_radius * growth_fraction;
        self.score += other_radius.floor() as u32;
    }

    /// Put the entity back into play with a fresh body.
    #[inline]
    pub fn respawn(&mut self, position: Vec2, radius: f32) {
        self.position = position;
        self.radius = radius;
        self.score = 0;
    }
}

/// Trait for players and bots, the entities that move and eat each other.
pub trait Entity: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn data(&self) -> &EntityData;

    fn data_mut(&mut self) -> &mut EntityData;

    /// Called after the entity has been eaten and respawned.
    fn on_respawn(&mut self) {}
}
