//! Food pellet.

use super::body::EntityData;
use glam::Vec2;
use protocol::{Color, FoodView};

/// A food pellet that players and bots can eat.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: u32,
    pub data: EntityData,
    pub color: Color,
}

impl Food {
    pub fn new(id: u32, position: Vec2, radius: f32, color: Color) -> Self {
        Self {
            id,
            data: EntityData::new(position, radius),
            color,
        }
    }

    pub fn view(&self) -> FoodView {
        FoodView {
            id: self.id,
            x: self.data.position.x,
            y: self.data.position.y,
            radius: self.data.radius,
            color: self.color,
        }
    }
}
