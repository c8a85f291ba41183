//! Server -> Client messages.

use serde::{Deserialize, Serialize};

use crate::{Color, ProtocolError};

/// Identifier of a player or bot as seen by clients.
///
/// Players are numbered per epoch, bots are named after their character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Player(u32),
    Bot(String),
}

/// A player or bot in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub character: String,
    pub score: u32,
    pub is_bot: bool,
}

/// A food pellet in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
}

/// Server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once to a connection right after it joins.
    Init {
        id: u32,
        food: Vec<FoodView>,
        players: Vec<EntityView>,
    },
    /// Full world snapshot, sent every tick.
    State {
        players: Vec<EntityView>,
        food: Vec<FoodView>,
    },
    /// The game was reset; clients go back to character selection.
    Restart,
}

impl ServerMessage {
    /// Encode the message as a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a server message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
