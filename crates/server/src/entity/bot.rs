//! AI-controlled bot.

use super::body::{Entity, EntityData, EntityKind};
use glam::Vec2;
use protocol::{EntityId, EntityView};

/// What a bot reacted to on its last tick. Resolved by id every tick, never owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotTarget {
    /// Seeking this food pellet.
    Food(u32),
    /// Fleeing this player.
    Player(u32),
}

/// A bot standing in for a character no player holds.
#[derive(Debug, Clone)]
pub struct Bot {
    pub data: EntityData,
    pub character: String,
    pub target: Option<BotTarget>,
}

impl Bot {
    pub fn new(character: String, position: Vec2, radius: f32) -> Self {
        Self {
            data: EntityData::new(position, radius),
            character,
            target: None,
        }
    }

    /// Bot ids are derived from the character, which is unique among bots.
    pub fn id(&self) -> String {
        format!("bot_{}", self.character)
    }

    pub fn view(&self) -> EntityView {
        EntityView {
            id: EntityId::Bot(self.id()),
            x: self.data.position.x,
            y: self.data.position.y,
            radius: self.data.radius,
            character: self.character.clone(),
            score: self.data.score,
            is_bot: true,
        }
    }
}

impl Entity for Bot {
    fn kind(&self) -> EntityKind {
        EntityKind::Bot
    }

    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn on_respawn(&mut self) {
        self.target = None;
    }
}
