//! One tick of the world simulation.
//!
//! Order is fixed: player movement, bot movement, food consumption,
//! player/bot consumption, food replenishment.

use crate::ai::BotDirector;
use crate::collision::{can_consume, check_collision, contains_point};
use crate::config::Config;
use crate::entity::{EntityData, EntityKind};
use crate::world::{EntityKey, World};

/// What happened during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub food_eaten: usize,
    pub consumptions: usize,
    pub food_spawned: usize,
}

/// Advance the world by one tick.
pub fn step(world: &mut World, director: &BotDirector, config: &Config) -> TickReport {
    move_players(world, config);
    director.update(world);
    let food_eaten = consume_food(world, config);
    let consumptions = consume_entities(world, director, config);
    settle(world);
    let food_spawned = world.spawn_food(config.food.target_count, config.food.radius, &config.food.colors);

    TickReport {
        food_eaten,
        consumptions,
        food_spawned,
    }
}

/// Apply each player's stored input once.
fn move_players(world: &mut World, config: &Config) {
    let border = world.border;
    for player in world.players.values_mut() {
        let direction = player.input.normalize_or_zero();
        let data = &mut player.data;
        data.position = border.clamp(data.position + direction * config.player.speed, data.radius);
    }
}

/// Let every player and bot eat the pellets under its center.
///
/// Pellets are scanned from the back of the list and the eater grows after
/// each one, so a pellet can come into reach later in the same scan. A pellet
/// leaves the world as soon as it is eaten and is counted at most once.
fn consume_food(world: &mut World, config: &Config) -> usize {
    let growth = config.food.growth;
    let keys = world.contestants();
    let World {
        players, bots, food, ..
    } = world;

    let mut eaten = 0;
    for key in keys {
        let data: &mut EntityData = match key {
            EntityKey::Player(id) => match players.get_mut(&id) {
                Some(player) => &mut player.data,
                None => continue,
            },
            EntityKey::Bot(index) => match bots.get_mut(index) {
                Some(bot) => &mut bot.data,
                None => continue,
            },
        };
        for index in (0..food.len()).rev() {
            if contains_point(data.position, data.radius, food[index].data.position) {
                food.remove(index);
                data.on_eat_food(growth);
                eaten += 1;
            }
        }
    }
    eaten
}

/// Resolve player/bot consumption over every ordered pair.
///
/// Pairs are read from live state: an entity respawned earlier in the pass is
/// checked again at its new position and size within the same tick.
fn consume_entities(world: &mut World, director: &BotDirector, config: &Config) -> usize {
    let keys = world.contestants();
    let mut consumptions = 0;

    for i in (0..keys.len()).rev() {
        for j in (0..keys.len()).rev() {
            if i == j {
                continue;
            }
            let (Some(a), Some(b)) = (world.entity(keys[i]), world.entity(keys[j])) else {
                continue;
            };
            let (a, b) = (*a.data(), *b.data());

            let hit = check_collision(a.position, a.radius, b.position, b.radius);
            if !hit.is_colliding() || !can_consume(a.radius, b.radius, config.consume.margin) {
                continue;
            }

            if let Some(eater) = world.entity_mut(keys[i]) {
                eater.data_mut().on_eat(b.radius, config.consume.growth_fraction);
            }
            let border = world.border;
            if let Some(prey) = world.entity_mut(keys[j]) {
                let radius = match prey.kind() {
                    EntityKind::Bot => director.spawn_radius(),
                    EntityKind::Player => config.player.spawn_radius,
                };
                prey.data_mut().respawn(border.random_position(radius), radius);
                prey.on_respawn();
            }
            consumptions += 1;
        }
    }
    consumptions
}

/// Growth can push a circle over the border; pull everyone back inside.
fn settle(world: &mut World) {
    let border = world.border;
    for key in world.contestants() {
        if let Some(entity) = world.entity_mut(key) {
            let data = entity.data_mut();
            data.position = border.clamp(data.position, data.radius);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::entity::{Bot, Food};
    use glam::Vec2;
    use protocol::Color;

    fn setup() -> (World, BotDirector, Config) {
        let config = Config::default();
        let world = World::new(config.border.width, config.border.height);
        let director = BotDirector::new(BotConfig {
            characters: vec!["A".into(), "B".into()],
            ..config.bot.clone()
        });
        (world, director, config)
    }

    fn place_player(world: &mut World, x: f32, y: f32, radius: f32) -> u32 {
        let id = world.add_player("A".into(), radius);
        world.players.get_mut(&id).unwrap().data.position = Vec2::new(x, y);
        id
    }

    /// A director whose bots never flee, so with no food they stand still.
    fn calm_director(config: &Config) -> BotDirector {
        BotDirector::new(BotConfig {
            characters: vec!["B".into()],
            flee_distance: 0.0,
            ..config.bot.clone()
        })
    }

    fn pellet(id: u32, x: f32, y: f32) -> Food {
        Food::new(id, Vec2::new(x, y), 5.0, Color::new(255, 0, 0))
    }

    #[test]
    fn test_player_moves_by_normalized_input() {
        let (mut world, director, config) = setup();
        let id = place_player(&mut world, 500.0, 500.0, 20.0);
        world.players.get_mut(&id).unwrap().input = Vec2::new(30.0, 40.0);

        step(&mut world, &director, &config);
        let pos = world.players[&id].data.position;
        assert!((pos.x - 503.0).abs() < 1e-4);
        assert!((pos.y - 504.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_input_stays_put() {
        let (mut world, director, config) = setup();
        let id = place_player(&mut world, 500.0, 500.0, 20.0);

        step(&mut world, &director, &config);
        assert_eq!(world.players[&id].data.position, Vec2::new(500.0, 500.0));
    }

    #[test]
    fn test_movement_clamped_at_world_edge() {
        let (mut world, director, config) = setup();
        let id = place_player(&mut world, 1897.0, 22.0, 20.0);
        world.players.get_mut(&id).unwrap().input = Vec2::new(1.0, -1.0);

        for _ in 0..10 {
            step(&mut world, &director, &config);
        }
        let data = world.players[&id].data;
        assert_eq!(data.position.x, config.border.width - data.radius);
        assert_eq!(data.position.y, data.radius);
    }

    #[test]
    fn test_food_consumption() {
        let (mut world, director, config) = setup();
        let id = place_player(&mut world, 500.0, 500.0, 20.0);
        world.food.push(pellet(901, 510.0, 500.0));
        world.food.push(pellet(902, 900.0, 900.0));

        let report = step(&mut world, &director, &config);
        let data = world.players[&id].data;
        assert_eq!(report.food_eaten, 1);
        assert_eq!(data.score, 1);
        assert_eq!(data.radius, 21.0);
        assert!(world.food.iter().all(|f| f.id != 901));
        assert!(world.food.iter().any(|f| f.id == 902));
        assert_eq!(world.food.len(), config.food.target_count);
    }

    #[test]
    fn test_growth_brings_earlier_pellet_into_reach() {
        let (mut world, director, config) = setup();
        let id = place_player(&mut world, 500.0, 500.0, 20.0);
        world.food.push(pellet(901, 520.5, 500.0));
        world.food.push(pellet(902, 510.0, 500.0));

        let report = step(&mut world, &director, &config);
        let data = world.players[&id].data;
        assert_eq!(report.food_eaten, 2);
        assert_eq!(data.score, 2);
        assert_eq!(data.radius, 22.0);
        assert!(world.food.iter().all(|f| f.id != 901 && f.id != 902));
    }

    #[test]
    fn test_food_is_eaten_once() {
        let (mut world, director, config) = setup();
        let first = place_player(&mut world, 500.0, 500.0, 20.0);
        let second = place_player(&mut world, 505.0, 500.0, 20.0);
        world.food.push(pellet(1, 502.0, 500.0));

        let report = step(&mut world, &director, &config);
        assert_eq!(report.food_eaten, 1);
        let total = world.players[&first].data.score + world.players[&second].data.score;
        assert_eq!(total, 1);
    }

    #[test]
    fn test_player_eats_bot() {
        let (mut world, _, config) = setup();
        let director = calm_director(&config);
        let id = place_player(&mut world, 500.0, 500.0, 30.0);
        world.bots.push(Bot::new("B".into(), Vec2::new(540.0, 500.0), 25.0));
        world.bots[0].data.score = 7;

        let report = step(&mut world, &director, &config);
        assert_eq!(report.consumptions, 1);

        let player = world.players[&id].data;
        assert_eq!(player.radius, 35.0);
        assert_eq!(player.score, 25);
        let bot = world.bots[0].data;
        assert_eq!(bot.score, 0);
        assert!((20.0..=30.0).contains(&bot.radius));
    }

    #[test]
    fn test_bot_eats_player() {
        let (mut world, director, config) = setup();
        let id = place_player(&mut world, 500.0, 500.0, 20.0);
        world.players.get_mut(&id).unwrap().data.score = 9;
        world.bots.push(Bot::new("B".into(), Vec2::new(510.0, 500.0), 28.0));

        let report = step(&mut world, &director, &config);
        assert_eq!(report.consumptions, 1);
        let player = world.players[&id].data;
        assert_eq!(player.score, 0);
        assert_eq!(player.radius, config.player.spawn_radius);
        let bot = world.bots[0].data;
        assert_eq!(bot.score, 20);
        assert_eq!(bot.radius, 32.0);
    }

    #[test]
    fn test_eater_grows_into_second_victim_in_reverse_order() {
        // Keys are [P1, P2, P3]. P3 is checked first and meets P2 before P1:
        // only after eating P2 is it big enough for P1.
        let (mut world, director, config) = setup();
        let big = place_player(&mut world, 470.0, 500.0, 32.0);
        let small = place_player(&mut world, 530.0, 500.0, 25.0);
        let eater = place_player(&mut world, 500.0, 500.0, 30.0);

        let report = step(&mut world, &director, &config);
        assert_eq!(report.consumptions, 2);

        let data = world.players[&eater].data;
        assert_eq!(data.score, 25 + 32);
        assert!((data.radius - (35.0 + 32.0 * 0.2)).abs() < 1e-4);
        for id in [big, small] {
            let victim = world.players[&id].data;
            assert_eq!(victim.score, 0);
            assert_eq!(victim.radius, config.player.spawn_radius);
        }
    }

    #[test]
    fn test_respawned_entity_is_checked_again() {
        // In a world exactly one spawn circle wide every body is pushed to the
        // center and every respawn lands there too.
        let mut config = Config::default();
        config.border.width = 40.0;
        config.border.height = 40.0;
        let mut world = World::new(40.0, 40.0);
        let director = BotDirector::new(config.bot.clone());
        let prey = place_player(&mut world, 20.0, 20.0, 20.0);
        let second = place_player(&mut world, 20.0, 20.0, 29.0);
        let first = place_player(&mut world, 20.0, 20.0, 30.0);

        let report = step(&mut world, &director, &config);
        assert_eq!(report.consumptions, 2);
        assert_eq!(world.players[&first].data.score, 20);
        assert_eq!(world.players[&second].data.score, 20);
        assert_eq!(world.players[&first].data.radius, 34.0);
        assert_eq!(world.players[&second].data.radius, 33.0);

        let respawned = world.players[&prey].data;
        assert_eq!(respawned.score, 0);
        assert_eq!(respawned.radius, 20.0);
        assert_eq!(respawned.position, Vec2::new(20.0, 20.0));
    }

    #[test]
    fn test_within_margin_no_consumption() {
        let (mut world, director, config) = setup();
        let first = place_player(&mut world, 500.0, 500.0, 21.0);
        let second = place_player(&mut world, 510.0, 500.0, 20.0);

        let report = step(&mut world, &director, &config);
        assert_eq!(report.consumptions, 0);
        assert_eq!(world.players[&first].data.radius, 21.0);
        assert_eq!(world.players[&second].data.radius, 20.0);
    }

    #[test]
    fn test_consumption_is_never_removal() {
        let (mut world, director, config) = setup();
        place_player(&mut world, 500.0, 500.0, 60.0);
        place_player(&mut world, 520.0, 500.0, 20.0);
        world.bots.push(Bot::new("B".into(), Vec2::new(480.0, 500.0), 22.0));

        step(&mut world, &director, &config);
        assert_eq!(world.players.len(), 2);
        assert_eq!(world.bots.len(), 1);
    }

    #[test]
    fn test_invariants_hold_over_many_ticks() {
        let (mut world, director, config) = setup();
        for i in 0..4 {
            let id = world.add_player(format!("P{i}"), config.player.spawn_radius);
            world.players.get_mut(&id).unwrap().input = Vec2::new(i as f32 - 1.5, 1.0);
        }
        director.rebalance(&mut world);

        for _ in 0..300 {
            step(&mut world, &director, &config);
            assert_eq!(world.food.len(), config.food.target_count);
            for data in world.bodies() {
                assert!(data.radius > 0.0);
                assert!(world.border.contains(data.position, data.radius), "{data:?} escaped");
            }
        }
    }
}
