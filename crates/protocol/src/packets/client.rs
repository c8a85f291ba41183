//! Client -> Server messages.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Enter the arena with the given character skin.
    Join { character: String },
    /// Directional intent. Not normalized by the client.
    Move {
        #[serde(default)]
        dx: f32,
        #[serde(default)]
        dy: f32,
    },
    /// Reset the whole game for everyone.
    Restart,
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the message as a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
