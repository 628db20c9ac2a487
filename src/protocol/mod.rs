//! Wire protocol: opcodes, message frames, and framing codec

pub mod codec;
pub mod message;
pub mod opcode;

pub use message::Message;
pub use opcode::OpCode;
