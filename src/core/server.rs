//! Integrated server service that coordinates sessions and rooms
//!
//! The two registries are the only cross-task shared state. Every
//! mutation runs under one write guard; outbound sends always happen
//! after the guard is dropped, from a snapshot taken under it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

use crate::constants::SERVER_HANDLE;
use crate::core::connection::Connection;
use crate::core::room::RoomManager;
use crate::core::session::SessionManager;
use crate::error::{ParleyError, Result};
use crate::protocol::{Message, OpCode};

/// Integrated server service that manages sessions and rooms together
pub struct ServerManager {
    sessions: Arc<RwLock<SessionManager>>,
    rooms: Arc<RwLock<RoomManager>>,
}

impl ServerManager {
    /// Create a new server manager with the default room in place
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionManager::new())),
            rooms: Arc::new(RwLock::new(RoomManager::new())),
        }
    }

    /// Register a negotiated handle and auto-join the default room.
    /// The duplicate check and insert are atomic under the write guard.
    pub async fn register_client(&self, handle: &str, connection: Connection) -> Result<()> {
        {
            let mut sessions = self.sessions.write().await;
            sessions.register(handle.to_string(), connection)?;
        }

        let default_room = {
            let mut rooms = self.rooms.write().await;
            let default_room = rooms.default_room().to_string();
            // a freshly registered handle cannot already be a member
            rooms.add_member(&default_room, handle)?;
            default_room
        };

        self.notify_joined(&default_room, handle).await;
        Ok(())
    }

    /// Unregister a client: removes the session and all room
    /// memberships. Idempotent; both the connection handler's Closed
    /// path and the stale sweep may call it.
    pub async fn unregister_client(&self, handle: &str) {
        {
            let mut sessions = self.sessions.write().await;
            sessions.unregister(handle);
        }
        let mut rooms = self.rooms.write().await;
        rooms.remove_handle_everywhere(handle);
    }

    /// Create a room with the client as its first member
    pub async fn create_room(&self, name: &str, creator: &str) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        rooms.create_room(name.to_string(), creator)
    }

    /// Join a client to a room and notify the membership
    pub async fn join_room(&self, handle: &str, room_name: &str) -> Result<()> {
        // Only connected clients can hold room membership
        {
            let sessions = self.sessions.read().await;
            if !sessions.contains(handle) {
                return Err(ParleyError::SessionNotFound(handle.to_string()));
            }
        }

        {
            let mut rooms = self.rooms.write().await;
            rooms.add_member(room_name, handle)?;
        }

        self.notify_joined(room_name, handle).await;
        Ok(())
    }

    /// Remove a client from a room and notify the remaining members
    pub async fn leave_room(&self, handle: &str, room_name: &str) -> Result<()> {
        let remaining = {
            let mut rooms = self.rooms.write().await;
            rooms.remove_member(room_name, handle)?
        };

        if remaining.iter().any(|m| m != SERVER_HANDLE) {
            let notice = Message::from_server(
                OpCode::ServerBroadcastMessage,
                room_name,
                &format!("{} left the room", handle),
            );
            if let Err(e) = self.broadcast_to_room(room_name, &notice, None).await {
                log::warn!("Failed to send leave notice for room {}: {}", room_name, e);
            }
        }
        Ok(())
    }

    /// Broadcast a "joined" notice once a room has company beyond the
    /// newcomer. Best-effort.
    async fn notify_joined(&self, room_name: &str, handle: &str) {
        let has_audience = {
            let rooms = self.rooms.read().await;
            match rooms.list_members(room_name) {
                Ok(members) => {
                    members
                        .iter()
                        .filter(|m| *m != SERVER_HANDLE)
                        .count()
                        > 1
                }
                Err(_) => false,
            }
        };

        if has_audience {
            let notice = Message::from_server(
                OpCode::ServerBroadcastMessage,
                room_name,
                &format!("{} joined", handle),
            );
            if let Err(e) = self.broadcast_to_room(room_name, &notice, None).await {
                log::warn!("Failed to send join notice for room {}: {}", room_name, e);
            }
        }
    }

    /// Broadcast a message to all members of a room, skipping the
    /// server pseudo-member and the optionally excluded handle.
    /// Returns the number of successful sends.
    pub async fn broadcast_to_room(
        &self,
        room_name: &str,
        message: &Message,
        exclude: Option<&str>,
    ) -> Result<usize> {
        // Snapshot the membership, then release the lock before sending
        let members = {
            let rooms = self.rooms.read().await;
            rooms.list_members(room_name)?
        };

        let mut send_tasks = Vec::new();
        {
            let sessions = self.sessions.read().await;

            for member in members {
                if member == SERVER_HANDLE {
                    continue;
                }
                if exclude == Some(member.as_str()) {
                    continue;
                }

                if let Some(connection) = sessions.get(&member) {
                    let message = message.clone();
                    let sender = connection.sender.clone();

                    let task = tokio::spawn(async move {
                        match sender.send(message) {
                            Ok(_) => {
                                log::trace!("Message queued for {}", member);
                                true
                            }
                            Err(_) => {
                                log::warn!("Failed to queue broadcast for {}", member);
                                false
                            }
                        }
                    });
                    send_tasks.push(task);
                }
            }
        }

        let results = futures_util::future::join_all(send_tasks).await;
        let sent_count = results
            .into_iter()
            .filter_map(|result| result.ok())
            .filter(|&success| success)
            .count();

        Ok(sent_count)
    }

    /// Send a message to a specific connected client
    pub async fn send_to_user(&self, handle: &str, message: Message) -> Result<bool> {
        let sessions = self.sessions.read().await;
        match sessions.get(handle) {
            Some(connection) => Ok(connection.send(message)),
            None => Err(ParleyError::SessionNotFound(handle.to_string())),
        }
    }

    /// Refresh a session's inactivity stamp
    pub async fn touch_session(&self, handle: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(connection) = sessions.get_mut(handle) {
            connection.touch();
        }
    }

    /// List all room names
    pub async fn list_rooms(&self) -> Vec<String> {
        self.rooms.read().await.list_room_names()
    }

    /// Get room members
    pub async fn list_members(&self, room_name: &str) -> Result<Vec<String>> {
        self.rooms.read().await.list_members(room_name)
    }

    /// Check room membership
    pub async fn is_member(&self, room_name: &str, handle: &str) -> Result<bool> {
        self.rooms.read().await.is_member(room_name, handle)
    }

    /// Get connection count
    pub async fn connection_count(&self) -> usize {
        self.sessions.read().await.client_count()
    }

    /// Diagnostic list of connected handles
    pub async fn session_snapshot(&self) -> Vec<String> {
        self.sessions.read().await.snapshot()
    }

    /// Start automatic cleanup of sessions whose connection task died
    /// without running its Closed path. `stale_after` must comfortably
    /// exceed the idle timeout so the sweep never races a live task.
    pub fn start_cleanup_task(self: Arc<Self>, cleanup_interval: Duration, stale_after: Duration) {
        let server = Arc::clone(&self);
        tokio::spawn(async move {
            let mut interval = interval(cleanup_interval);
            loop {
                interval.tick().await;

                let stale = {
                    let sessions = server.sessions.read().await;
                    sessions.check_stale_connections(stale_after)
                };

                if !stale.is_empty() {
                    log::info!("Cleaning up {} stale sessions", stale.len());
                    for handle in stale {
                        server.unregister_client(&handle).await;
                        log::debug!("Cleaned up stale session: {}", handle);
                    }
                }
            }
        });
    }
}

impl Default for ServerManager {
    fn default() -> Self {
        Self::new()
    }
}

// Shared reference to server manager
pub type SharedServerManager = Arc<ServerManager>;
