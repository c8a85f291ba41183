//! Human-controlled player.

use super::body::{Entity, EntityData, EntityKind};
use glam::Vec2;
use protocol::{EntityId, EntityView};

/// A player owned by a connection.
#[derive(Debug, Clone)]
pub struct Player {
    /// Id within the current epoch, starting at 1.
    pub id: u32,
    pub data: EntityData,
    /// Skin chosen at join.
    pub character: String,
    /// Last directional intent, stored raw.
    pub input: Vec2,
}

impl Player {
    pub fn new(id: u32, character: String, position: Vec2, radius: f32) -> Self {
        Self {
            id,
            data: EntityData::new(position, radius),
            character,
            input: Vec2::ZERO,
        }
    }

    pub fn view(&self) -> EntityView {
        EntityView {
            id: EntityId::Player(self.id),
            x: self.data.position.x,
            y: self.data.position.y,
            radius: self.data.radius,
            character: self.character.clone(),
            score: self.data.score,
            is_bot: false,
        }
    }
}

impl Entity for Player {
    fn kind(&self) -> EntityKind {
        EntityKind::Player
    }

    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }
}
