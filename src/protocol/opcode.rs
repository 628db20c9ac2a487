//! Operation codes identifying every request and reply kind
//!
//! The numeric space is fixed wire contract: connection lifecycle codes
//! live below 100, client requests in the 100 range, server replies in
//! the 200 range. Code 1000 is an internal sentinel for decode failure
//! and never appears on the wire.

use serde::{Deserialize, Serialize};

/// Closed enumeration of protocol operation codes
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum OpCode {
    // Connection lifecycle (1 - 5)
    ConnectionSuccess = 1,
    ConnectionFailure = 2,
    ConnectionPing = 3,
    ConnectionAck = 4,
    ConnectionClosed = 5,

    // Client requests (100 - 109)
    ClientRequestConnection = 100,
    ClientCreateRoom = 101,
    ClientJoinRoom = 102,
    ClientLeaveRoom = 103,
    ClientListRoom = 104,
    ClientListMember = 105,
    ClientSendMessage = 106,
    ClientSendPubMessage = 107,
    ClientChangeNick = 108,
    ClientInRoom = 109,

    // Server replies (204 - 208)
    ServerRplListRoom = 204,
    ServerRplListMember = 205,
    ServerTellMessage = 206,
    ServerBroadcastMessage = 207,
    ServerRplClientInRoom = 208,

    // Internal decode-failure sentinel, never sent
    Error = 1000,
}

impl OpCode {
    /// Convert from the wire representation, None for unknown codes
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(OpCode::ConnectionSuccess),
            2 => Some(OpCode::ConnectionFailure),
            3 => Some(OpCode::ConnectionPing),
            4 => Some(OpCode::ConnectionAck),
            5 => Some(OpCode::ConnectionClosed),

            100 => Some(OpCode::ClientRequestConnection),
            101 => Some(OpCode::ClientCreateRoom),
            102 => Some(OpCode::ClientJoinRoom),
            103 => Some(OpCode::ClientLeaveRoom),
            104 => Some(OpCode::ClientListRoom),
            105 => Some(OpCode::ClientListMember),
            106 => Some(OpCode::ClientSendMessage),
            107 => Some(OpCode::ClientSendPubMessage),
            108 => Some(OpCode::ClientChangeNick),
            109 => Some(OpCode::ClientInRoom),

            204 => Some(OpCode::ServerRplListRoom),
            205 => Some(OpCode::ServerRplListMember),
            206 => Some(OpCode::ServerTellMessage),
            207 => Some(OpCode::ServerBroadcastMessage),
            208 => Some(OpCode::ServerRplClientInRoom),

            1000 => Some(OpCode::Error),
            _ => None,
        }
    }

    /// Check if this code is a connection lifecycle message
    pub fn is_lifecycle(&self) -> bool {
        (*self as i16) < 100
    }

    /// Check if this code is a client request
    pub fn is_client_request(&self) -> bool {
        let val = *self as i16;
        (100..200).contains(&val)
    }

    /// Check if this code is a server reply
    pub fn is_server_reply(&self) -> bool {
        let val = *self as i16;
        (200..300).contains(&val)
    }
}

impl From<OpCode> for i16 {
    fn from(op: OpCode) -> i16 {
        op as i16
    }
}

impl TryFrom<i16> for OpCode {
    type Error = String;

    fn try_from(value: i16) -> std::result::Result<Self, String> {
        OpCode::from_i16(value).ok_or_else(|| format!("unknown opcode: {}", value))
    }
}
