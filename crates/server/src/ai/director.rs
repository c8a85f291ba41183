//! Bot population management.

use super::steering::steer;
use crate::config::BotConfig;
use crate::entity::Bot;
use crate::world::World;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Outcome of a rebalance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rebalance {
    pub added: usize,
    pub removed: usize,
}

/// Keeps one bot per unclaimed character and drives them every tick.
#[derive(Debug, Clone)]
pub struct BotDirector {
    config: BotConfig,
}

impl BotDirector {
    pub fn new(config: BotConfig) -> Self {
        Self { config }
    }

    /// Random bot radius within the configured range.
    pub fn spawn_radius(&self) -> f32 {
        rand::rng().random_range(self.config.min_radius..=self.config.max_radius)
    }

    /// Recompute the bot set from the characters players currently hold.
    ///
    /// Bots whose character is still free keep their state; bots for newly
    /// claimed characters are dropped and newly freed characters get a fresh bot.
    pub fn rebalance(&self, world: &mut World) -> Rebalance {
        let claimed: HashSet<&str> = world.players.values().map(|p| p.character.as_str()).collect();
        let mut existing: HashMap<String, Bot> =
            world.bots.drain(..).map(|b| (b.character.clone(), b)).collect();
        let before = existing.len();

        let mut seen = HashSet::new();
        let mut bots = Vec::with_capacity(self.config.characters.len());
        let mut added = 0;
        for character in &self.config.characters {
            if claimed.contains(character.as_str()) || !seen.insert(character.as_str()) {
                continue;
            }
            let bot = existing.remove(character).unwrap_or_else(|| {
                added += 1;
                let radius = self.spawn_radius();
                Bot::new(character.clone(), world.border.random_position(radius), radius)
            });
            bots.push(bot);
        }

        let kept = bots.len() - added;
        world.bots = bots;
        Rebalance {
            added,
            removed: before - kept,
        }
    }

    /// Move every bot one tick according to its steering decision.
    pub fn update(&self, world: &mut World) {
        for index in 0..world.bots.len() {
            let body = world.bots[index].data;
            let steering = steer(&body, &world.players, &world.food, &self.config);

            let border = world.border;
            let bot = &mut world.bots[index];
            bot.target = steering.target;
            let data = &mut bot.data;
            data.position = border.clamp(data.position + steering.velocity, data.radius);
        }
    }
}
