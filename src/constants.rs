// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 6667;

// Connection deadlines, in seconds
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

// Registry names with fixed meaning on the wire
pub const DEFAULT_ROOM: &str = "public";
pub const SERVER_HANDLE: &str = "server";

// Upper bound on a single frame payload (1 MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
