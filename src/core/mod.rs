//! Core functionality for the chat server

pub mod connection;
pub mod message_handler;
pub mod room;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use connection::Connection;
pub use message_handler::{Flow, MessageHandler};
pub use room::{Room, RoomManager};
pub use server::{ServerManager, SharedServerManager};
pub use session::SessionManager;
