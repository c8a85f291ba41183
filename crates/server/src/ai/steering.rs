//! Per-bot targeting heuristic.

use crate::config::BotConfig;
use crate::entity::{BotTarget, EntityData, Food, Player};
use glam::Vec2;
use std::collections::HashMap;

/// A bot's decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub target: Option<BotTarget>,
    /// Displacement to apply this tick.
    pub velocity: Vec2,
}

impl Steering {
    const IDLE: Self = Self {
        target: None,
        velocity: Vec2::ZERO,
    };
}

/// Decide how a bot moves this tick.
///
/// Flee the nearest player if it is bigger and within `flee_distance`,
/// otherwise head for the nearest food, otherwise stay put. Other bots are
/// ignored. Nothing carries over between ticks.
pub fn steer(bot: &EntityData, players: &HashMap<u32, Player>, food: &[Food], config: &BotConfig) -> Steering {
    let nearest_player = players
        .values()
        .map(|p| (p, p.data.position.distance(bot.position)))
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.id.cmp(&b.0.id)));

    if let Some((player, dist)) = nearest_player {
        if player.data.radius > bot.radius && dist < config.flee_distance {
            let away = (bot.position - player.data.position).normalize_or_zero();
            return Steering {
                target: Some(BotTarget::Player(player.id)),
                velocity: away * config.flee_speed,
            };
        }
    }

    let nearest_food = food
        .iter()
        .map(|f| (f, f.data.position.distance(bot.position)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest_food {
        Some((pellet, _)) => Steering {
            target: Some(BotTarget::Food(pellet.id)),
            velocity: (pellet.data.position - bot.position).normalize_or_zero() * config.seek_speed,
        },
        None => Steering::IDLE,
    }
}
