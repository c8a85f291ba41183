//! Server configuration.

use anyhow::{bail, Context};
use protocol::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub consume: ConsumeConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        let numbers = [
            ("border.width", self.border.width),
            ("border.height", self.border.height),
            ("player.spawn_radius", self.player.spawn_radius),
            ("player.speed", self.player.speed),
            ("bot.min_radius", self.bot.min_radius),
            ("bot.max_radius", self.bot.max_radius),
            ("bot.seek_speed", self.bot.seek_speed),
            ("bot.flee_speed", self.bot.flee_speed),
            ("bot.flee_distance", self.bot.flee_distance),
            ("food.radius", self.food.radius),
            ("food.growth", self.food.growth),
            ("consume.margin", self.consume.margin),
            ("consume.growth_fraction", self.consume.growth_fraction),
        ];
        if let Some((name, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            bail!("{name} must be a finite number, got {value}");
        }

        let (w, h) = (self.border.width, self.border.height);
        if !(w > 0.0 && h > 0.0) {
            bail!("border must have a positive size, got {w}x{h}");
        }
        let largest_spawn = self.player.spawn_radius.max(self.bot.max_radius).max(self.food.radius);
        if self.player.spawn_radius <= 0.0 || self.bot.min_radius <= 0.0 || self.food.radius <= 0.0 {
            bail!("spawn radii must be positive");
        }
        if 2.0 * largest_spawn > w.min(h) {
            bail!("spawn radius {largest_spawn} does not fit inside a {w}x{h} world");
        }
        if self.bot.min_radius > self.bot.max_radius {
            bail!(
                "bot.min_radius ({}) exceeds bot.max_radius ({})",
                self.bot.min_radius,
                self.bot.max_radius
            );
        }
        if self.food.colors.is_empty() {
            bail!("food.colors must contain at least one color");
        }
        Ok(())
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Outbound frames queued per connection before new ones are dropped.
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
    /// Skip ticks while nobody is connected.
    #[serde(default = "default_hibernate")]
    pub hibernate: bool,
}

impl ServerConfig {
    /// Time between two ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            tick_rate: default_tick_rate(),
            send_buffer: default_send_buffer(),
            hibernate: default_hibernate(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_tick_rate() -> u32 {
    30
}
fn default_send_buffer() -> usize {
    64
}
fn default_hibernate() -> bool {
    true
}

/// World border configuration. The world spans `[0, width] x [0, height]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_width")]
    pub width: f32,
    #[serde(default = "default_border_height")]
    pub height: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_width(),
            height: default_border_height(),
        }
    }
}

fn default_border_width() -> f32 {
    1920.0
}
fn default_border_height() -> f32 {
    1080.0
}

/// Human player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_spawn_radius")]
    pub spawn_radius: f32,
    #[serde(default = "default_player_speed")]
    pub speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_radius: default_player_spawn_radius(),
            speed: default_player_speed(),
        }
    }
}

fn default_player_spawn_radius() -> f32 {
    20.0
}
fn default_player_speed() -> f32 {
    5.0
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Character roster; one bot exists per character no player holds.
    #[serde(default = "default_characters")]
    pub characters: Vec<String>,
    #[serde(default = "default_bot_min_radius")]
    pub min_radius: f32,
    #[serde(default = "default_bot_max_radius")]
    pub max_radius: f32,
    #[serde(default = "default_bot_seek_speed")]
    pub seek_speed: f32,
    #[serde(default = "default_bot_flee_speed")]
    pub flee_speed: f32,
    /// Bots flee larger players closer than this.
    #[serde(default = "default_bot_flee_distance")]
    pub flee_distance: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            characters: default_characters(),
            min_radius: default_bot_min_radius(),
            max_radius: default_bot_max_radius(),
            seek_speed: default_bot_seek_speed(),
            flee_speed: default_bot_flee_speed(),
            flee_distance: default_bot_flee_distance(),
        }
    }
}

fn default_characters() -> Vec<String> {
    ["TripOK", "Вова", "Назар", "Егор", "Денис", "Максім", "Андрєй", "Саша", "Артем"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_bot_min_radius() -> f32 {
    20.0
}
fn default_bot_max_radius() -> f32 {
    30.0
}
fn default_bot_seek_speed() -> f32 {
    2.0
}
fn default_bot_flee_speed() -> f32 {
    3.0
}
fn default_bot_flee_distance() -> f32 {
    200.0
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Food count restored at the end of every tick.
    #[serde(default = "default_food_target_count")]
    pub target_count: usize,
    #[serde(default = "default_food_radius")]
    pub radius: f32,
    /// Radius gained per pellet eaten.
    #[serde(default = "default_food_growth")]
    pub growth: f32,
    #[serde(default = "default_food_colors")]
    pub colors: Vec<Color>,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            target_count: default_food_target_count(),
            radius: default_food_radius(),
            growth: default_food_growth(),
            colors: default_food_colors(),
        }
    }
}

fn default_food_target_count() -> usize {
    100
}
fn default_food_radius() -> f32 {
    5.0
}
fn default_food_growth() -> f32 {
    1.0
}
fn default_food_colors() -> Vec<Color> {
    vec![
        Color::new(0xFF, 0x00, 0x00),
        Color::new(0x00, 0xFF, 0x00),
        Color::new(0x00, 0x00, 0xFF),
        Color::new(0xFF, 0xFF, 0x00),
        Color::new(0xFF, 0x00, 0xFF),
    ]
}

/// Player/bot consumption rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsumeConfig {
    /// Radius advantage required to eat another entity.
    #[serde(default = "default_consume_margin")]
    pub margin: f32,
    /// Share of the victim's radius the eater gains.
    #[serde(default = "default_consume_growth_fraction")]
    pub growth_fraction: f32,
}

impl Default for ConsumeConfig {
    fn default() -> Self {
        Self {
            margin: default_consume_margin(),
            growth_fraction: default_consume_growth_fraction(),
        }
    }
}

fn default_consume_margin() -> f32 {
    2.0
}
fn default_consume_growth_fraction() -> f32 {
    0.2
}
