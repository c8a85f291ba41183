//! Bot AI: population management and per-tick steering.

mod director;
mod steering;

pub use director::{BotDirector, Rebalance};
pub use steering::{steer, Steering};
