//! Game entities.
//!
//! Players, bots and food share one body representation ([`EntityData`]);
//! the wrappers add what is specific to each category.

mod body;
mod bot;
mod food;
mod player;

pub use body::{Entity, EntityData, EntityKind};
pub use bot::{Bot, BotTarget};
pub use food::Food;
pub use player::Player;
