//! Arena game server library.

pub mod ai;
pub mod collision;
pub mod config;
pub mod entity;
pub mod server;
pub mod simulation;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{run, serve, start, GameState, ServerStats, SharedGame};
