//! Client connection management
//! Handles the outbound side and liveness of a single connection

use log::warn;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::Message;

/// Represents the server-side state of a single client connection.
/// The sender feeds the connection's writer task; dropping it closes
/// the socket.
pub struct Connection {
    pub id: String,
    pub remote_addr: SocketAddr,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
    pub last_activity: Instant,
}

impl Connection {
    /// Create a new connection with a unique ID
    pub fn new(remote_addr: SocketAddr, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            sender,
            connected_at: Instant::now(),
            last_activity: Instant::now(),
        }
    }

    /// Queue a message for this connection's writer task.
    /// Never blocks; returns false when the peer is already gone.
    pub fn send(&self, msg: Message) -> bool {
        match self.sender.send(msg) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to queue message for connection {}", self.id);
                false
            }
        }
    }

    /// Refresh the inactivity stamp
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Check if the connection has been silent past the timeout
    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
