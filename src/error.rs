use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ParleyError {
    // Session errors
    DuplicateHandle(String),
    SessionNotFound(String),
    InvalidHandle,

    // Connection errors
    ConnectionError(String),
    ConnectionClosed,

    // Frame errors
    MessageParseError(String),
    FrameTooLarge(usize),

    // Room errors
    RoomNotFound(String),
    RoomExists(String),
    AlreadyMember(String),
    NotAMember(String),

    // Routing errors
    ReceiverNotFound(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for ParleyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateHandle(handle) => write!(f, "nickname exists: {}", handle),
            Self::SessionNotFound(handle) => write!(f, "Session not found: {}", handle),
            Self::InvalidHandle => write!(f, "Handle must not be empty"),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::FrameTooLarge(size) => write!(f, "Frame too large: {} bytes", size),
            Self::RoomNotFound(name) => write!(f, "room {} doesn't exist", name),
            Self::RoomExists(name) => write!(f, "room exists: {}", name),
            Self::AlreadyMember(handle) => write!(f, "{} is already a member", handle),
            Self::NotAMember(handle) => write!(f, "{} is not a member", handle),
            Self::ReceiverNotFound(handle) => write!(f, "Receiver {} doesn't exist", handle),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ParleyError {}

impl From<std::io::Error> for ParleyError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset => {
                ParleyError::ConnectionClosed
            }
            _ => ParleyError::ConnectionError(err.to_string()),
        }
    }
}

// Generic result type for Parley
pub type Result<T> = std::result::Result<T, ParleyError>;
