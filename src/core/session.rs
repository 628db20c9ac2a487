//! Session registry: one entry per negotiated handle
//!
//! The manager itself is a plain map; it lives behind the
//! `ServerManager`'s `RwLock`, so every check-then-insert runs under a
//! single write guard and two concurrent registrations of the same
//! handle cannot both succeed.

use std::collections::HashMap;
use std::time::Duration;

use crate::constants::SERVER_HANDLE;
use crate::core::connection::Connection;
use crate::error::{ParleyError, Result};

/// Manages connected clients keyed by their unique handle
pub struct SessionManager {
    sessions: HashMap<String, Connection>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Register a new client. Atomic check-and-insert: fails with
    /// `DuplicateHandle` when the handle is taken, `InvalidHandle` when
    /// it is empty.
    pub fn register(&mut self, handle: String, connection: Connection) -> Result<()> {
        if handle.is_empty() {
            return Err(ParleyError::InvalidHandle);
        }
        // the server pseudo-handle is permanently taken
        if handle == SERVER_HANDLE || self.sessions.contains_key(&handle) {
            return Err(ParleyError::DuplicateHandle(handle));
        }
        self.sessions.insert(handle, connection);
        Ok(())
    }

    /// Remove a client. Removing an absent handle is a no-op.
    pub fn unregister(&mut self, handle: &str) {
        self.sessions.remove(handle);
    }

    pub fn get(&self, handle: &str) -> Option<&Connection> {
        self.sessions.get(handle)
    }

    pub fn get_mut(&mut self, handle: &str) -> Option<&mut Connection> {
        self.sessions.get_mut(handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.sessions.contains_key(handle)
    }

    /// Current list of registered handles, for diagnostics
    pub fn snapshot(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    // Get current clients count
    pub fn client_count(&self) -> usize {
        self.sessions.len()
    }

    /// Check for stale connections and return their handles
    pub fn check_stale_connections(&self, timeout: Duration) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|(_, conn)| conn.is_stale(timeout))
            .map(|(handle, _)| handle.clone())
            .collect()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
