//! Length-prefixed framing over a byte stream
//!
//! Frame format:
//! ```text
//! +----------------+------------------+
//! | length         | payload          |
//! | (4 bytes, BE)  | (variable)       |
//! +----------------+------------------+
//! ```
//!
//! The payload is one serialized [`Message`] record. Encoding is safe to
//! call concurrently for different connections; frames going to the same
//! connection are serialized by that connection's writer task.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::message::Message;
use crate::constants::MAX_FRAME_SIZE;
use crate::error::{ParleyError, Result};

/// Frame header size: 4 byte big-endian payload length
pub const FRAME_HEADER_SIZE: usize = 4;

/// Encode one message into a complete self-delimited frame
pub fn encode(msg: &Message) -> Result<Bytes> {
    let payload = serde_json::to_vec(msg)
        .map_err(|e| ParleyError::MessageParseError(e.to_string()))?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ParleyError::FrameTooLarge(payload.len()));
    }

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Decode one message from a complete frame
pub fn decode(data: &[u8]) -> Result<Message> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(ParleyError::MessageParseError(
            "incomplete frame header".to_string(),
        ));
    }

    let payload_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if payload_len > MAX_FRAME_SIZE {
        return Err(ParleyError::FrameTooLarge(payload_len));
    }
    if data.len() < FRAME_HEADER_SIZE + payload_len {
        return Err(ParleyError::MessageParseError(format!(
            "incomplete frame: expected {} payload bytes, got {}",
            payload_len,
            data.len() - FRAME_HEADER_SIZE
        )));
    }

    serde_json::from_slice(&data[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + payload_len])
        .map_err(|e| ParleyError::MessageParseError(e.to_string()))
}

/// Read exactly one frame from the stream. Blocks until a full frame
/// arrives; the caller layers its read deadline on top with
/// `tokio::time::timeout`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header).await?;

    let payload_len = u32::from_be_bytes(header) as usize;
    if payload_len > MAX_FRAME_SIZE {
        return Err(ParleyError::FrameTooLarge(payload_len));
    }

    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload).await?;

    serde_json::from_slice(&payload).map_err(|e| ParleyError::MessageParseError(e.to_string()))
}

/// Write one frame to the stream
pub async fn write_frame<W>(writer: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::opcode::OpCode;

    #[test]
    fn test_encode_decode_roundtrip() {
        let original = Message::new(OpCode::ClientSendPubMessage, "alice", "public", "hello");
        let encoded = encode(&original).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_decode_rejects_unknown_opcode() {
        let payload = br#"{"opcode":77,"sender":"a","receiver":"b","body_len":0,"body":""}"#;
        let mut frame = BytesMut::new();
        frame.put_u32(payload.len() as u32);
        frame.put_slice(payload);

        let result = decode(&frame);
        assert!(matches!(result, Err(ParleyError::MessageParseError(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_frame() {
        let original = Message::new(OpCode::ConnectionPing, "alice", "server", "ping");
        let encoded = encode(&original).unwrap();

        let result = decode(&encoded[..encoded.len() - 2]);
        assert!(matches!(result, Err(ParleyError::MessageParseError(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_length() {
        let mut frame = BytesMut::new();
        frame.put_u32((MAX_FRAME_SIZE + 1) as u32);
        frame.put_slice(b"x");

        let result = decode(&frame);
        assert!(matches!(result, Err(ParleyError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn test_async_read_write_roundtrip() {
        let original = Message::from_server(OpCode::ServerTellMessage, "bob", "welcome");

        let (mut client, mut server) = tokio::io::duplex(4096);
        write_frame(&mut client, &original).await.unwrap();

        let decoded = read_frame(&mut server).await.unwrap();
        assert_eq!(original, decoded);
    }

    #[tokio::test]
    async fn test_read_frame_on_closed_stream() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let result = read_frame(&mut server).await;
        assert!(matches!(result, Err(ParleyError::ConnectionClosed)));
    }
}
