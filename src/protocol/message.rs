use serde::{Deserialize, Serialize};

use super::opcode::OpCode;
use crate::constants::SERVER_HANDLE;

/// One wire message: opcode, addressing, and a text body.
/// `body_len` mirrors the body length for peers that want it; decode
/// does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub opcode: OpCode,
    pub sender: String,
    pub receiver: String,
    pub body_len: usize,
    pub body: String,
}

impl Message {
    pub fn new(opcode: OpCode, sender: &str, receiver: &str, body: &str) -> Self {
        Self {
            opcode,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            body_len: body.len(),
            body: body.to_string(),
        }
    }

    /// A message originated by the server itself
    pub fn from_server(opcode: OpCode, receiver: &str, body: &str) -> Self {
        Self::new(opcode, SERVER_HANDLE, receiver, body)
    }

    /// Relabel an inbound request as the given reply/forward opcode,
    /// keeping addressing and body intact
    pub fn relabeled(mut self, opcode: OpCode) -> Self {
        self.opcode = opcode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new(OpCode::ClientSendMessage, "alice", "bob", "hi there");
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.receiver, "bob");
        assert_eq!(msg.body_len, 8);
    }

    #[test]
    fn test_server_message_sender() {
        let msg = Message::from_server(OpCode::ServerTellMessage, "alice", "welcome");
        assert_eq!(msg.sender, SERVER_HANDLE);
        assert_eq!(msg.opcode, OpCode::ServerTellMessage);
    }

    #[test]
    fn test_relabel_keeps_addressing() {
        let msg = Message::new(OpCode::ClientSendPubMessage, "alice", "team", "hi")
            .relabeled(OpCode::ServerBroadcastMessage);
        assert_eq!(msg.opcode, OpCode::ServerBroadcastMessage);
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.receiver, "team");
    }
}
