use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::HashMap;

use crate::constants::{DEFAULT_ROOM, SERVER_HANDLE};
use crate::error::{ParleyError, Result};

/// A named group of handles that receive each other's broadcasts
#[derive(Debug, Clone)]
pub struct Room {
    pub name: String,
    /// Member handles in join order. The stable order makes broadcast
    /// delivery deterministic.
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Creates a new room with the given name
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a member to the room
    pub fn add_member(&mut self, handle: String) -> Result<()> {
        if self.members.iter().any(|m| m == &handle) {
            return Err(ParleyError::AlreadyMember(handle));
        }
        self.members.push(handle);
        Ok(())
    }

    /// Removes a member from the room, true when it was present
    pub fn remove_member(&mut self, handle: &str) -> bool {
        match self.members.iter().position(|m| m == handle) {
            Some(i) => {
                self.members.remove(i);
                true
            }
            None => false,
        }
    }

    /// Checks if a handle is a member of the room
    pub fn has_member(&self, handle: &str) -> bool {
        self.members.iter().any(|m| m == handle)
    }

    /// Returns the number of members in the room
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Manages all rooms on the server.
/// Lives behind the `ServerManager`'s lock; methods never perform I/O,
/// mutations return membership snapshots so the caller can send
/// notifications after releasing the lock.
pub struct RoomManager {
    rooms: HashMap<String, Room>,
    default_room: String,
}

impl RoomManager {
    /// Creates a new room manager with the always-present default room,
    /// seeded with the server pseudo-member.
    pub fn new() -> Self {
        let mut default_room = Room::new(DEFAULT_ROOM.to_string());
        default_room.members.push(SERVER_HANDLE.to_string());

        let mut rooms = HashMap::new();
        rooms.insert(DEFAULT_ROOM.to_string(), default_room);

        Self {
            rooms,
            default_room: DEFAULT_ROOM.to_string(),
        }
    }

    /// Creates a new room with the creator as its first member
    pub fn create_room(&mut self, name: String, creator: &str) -> Result<()> {
        if self.rooms.contains_key(&name) {
            return Err(ParleyError::RoomExists(name));
        }

        let mut room = Room::new(name.clone());
        room.add_member(creator.to_string())?;
        self.rooms.insert(name.clone(), room);
        info!("room {} created by {}", name, creator);
        Ok(())
    }

    /// Adds a handle to a room. Returns the membership snapshot after
    /// the join so the caller can notify the room outside the lock.
    pub fn add_member(&mut self, room_name: &str, handle: &str) -> Result<Vec<String>> {
        let room = self
            .rooms
            .get_mut(room_name)
            .ok_or_else(|| ParleyError::RoomNotFound(room_name.to_string()))?;
        room.add_member(handle.to_string())?;
        debug!("{} added to room {}", handle, room_name);
        Ok(room.members.clone())
    }

    /// Removes a handle from a room, deleting a non-default room that
    /// empties. Returns the remaining-member snapshot for the caller's
    /// "left" notice.
    pub fn remove_member(&mut self, room_name: &str, handle: &str) -> Result<Vec<String>> {
        let room = self
            .rooms
            .get_mut(room_name)
            .ok_or_else(|| ParleyError::RoomNotFound(room_name.to_string()))?;
        if !room.remove_member(handle) {
            return Err(ParleyError::NotAMember(handle.to_string()));
        }

        let remaining = room.members.clone();
        if remaining.is_empty() && room_name != self.default_room {
            self.rooms.remove(room_name);
            info!("empty room {} has been removed", room_name);
        }
        Ok(remaining)
    }

    /// Removes a handle from every room it belongs to, applying the
    /// empty-room deletion rule per room. Used on disconnect.
    pub fn remove_handle_everywhere(&mut self, handle: &str) {
        let mut emptied = Vec::new();
        for (name, room) in self.rooms.iter_mut() {
            if room.remove_member(handle) && room.members.is_empty() && name != &self.default_room {
                emptied.push(name.clone());
            }
        }
        for name in emptied {
            self.rooms.remove(&name);
            info!("empty room {} has been removed", name);
        }
    }

    /// Lists all room names
    pub fn list_room_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// Gets all members of a room
    pub fn list_members(&self, room_name: &str) -> Result<Vec<String>> {
        self.rooms
            .get(room_name)
            .map(|room| room.members.clone())
            .ok_or_else(|| ParleyError::RoomNotFound(room_name.to_string()))
    }

    /// Check if a handle is a member of a room
    pub fn is_member(&self, room_name: &str, handle: &str) -> Result<bool> {
        self.rooms
            .get(room_name)
            .map(|room| room.has_member(handle))
            .ok_or_else(|| ParleyError::RoomNotFound(room_name.to_string()))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Gets the default room name
    pub fn default_room(&self) -> &str {
        &self.default_room
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
