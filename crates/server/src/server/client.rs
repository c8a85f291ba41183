//! Client session state.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Process-unique connection identifier. Never reused.
pub type ConnectionId = u64;

/// A serialized text frame, shared between every recipient of a broadcast.
pub type Frame = Arc<str>;

/// Result of queueing a frame for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The connection is not keeping up; this frame was dropped.
    Dropped,
    /// The socket task is gone.
    Closed,
}

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Remote address.
    pub addr: SocketAddr,
    /// Player bound by the last successful join in this epoch.
    pub player_id: Option<u32>,
    /// Outbound frame queue drained by the socket task.
    outbound: mpsc::Sender<Frame>,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: ConnectionId, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            player_id: None,
            outbound,
        }
    }

    /// Queue a frame without waiting on the socket.
    pub fn send(&self, frame: &Frame) -> Delivery {
        match self.outbound.try_send(Arc::clone(frame)) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
