//! Message definitions for the arena protocol.
//!
//! Every frame is a JSON object discriminated by its `type` field. This
//! module contains both client->server and server->client messages.

mod client;
mod server;

pub use client::*;
pub use server::*;
