//! Per-connection task: handshake negotiation and the request loop
//!
//! Each accepted socket is split; a writer task drains the connection's
//! channel so that frames to one peer are always serialized, and the
//! reading side walks the AwaitingHandshake -> Active -> Closed state
//! machine.

use log::{debug, info, warn};
use std::net::SocketAddr;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::core::connection::Connection;
use crate::core::message_handler::{Flow, MessageHandler};
use crate::core::server::SharedServerManager;
use crate::error::ParleyError;
use crate::protocol::{codec, Message, OpCode};

/// Handle one client connection from accept to teardown
pub async fn handle_client(
    stream: TcpStream,
    remote_addr: SocketAddr,
    server: SharedServerManager,
    config: ServerConfig,
) {
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Writer task: the only place frames for this peer are encoded,
    // which serializes same-connection writes
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = codec::write_frame(&mut writer, &message).await {
                debug!("Write to {} failed: {}", remote_addr, e);
                break;
            }
        }
    });

    // AwaitingHandshake
    let handle = match negotiate_handle(&mut reader, &tx, remote_addr, &server, &config).await {
        Some(handle) => handle,
        None => return, // dropped silently; writer ends with tx
    };

    info!("{} has connected from {}", handle, remote_addr);
    info!("Current connections: {}", server.connection_count().await);

    // Active
    let router = MessageHandler::new(server.clone());
    loop {
        match timeout(config.idle_timeout, codec::read_frame(&mut reader)).await {
            Err(_) => {
                info!("{} idle for {:?}, closing", handle, config.idle_timeout);
                break;
            }
            Ok(Err(e)) => {
                debug!("{} read failed: {}", handle, e);
                break;
            }
            Ok(Ok(msg)) => {
                server.touch_session(&handle).await;
                if router.handle_request(&handle, msg).await == Flow::Close {
                    break;
                }
            }
        }
    }

    // Closed: best-effort notice, then deregister everywhere
    let notice = Message::from_server(
        OpCode::ConnectionClosed,
        &handle,
        "server has closed your connection",
    );
    let _ = tx.send(notice);

    server.unregister_client(&handle).await;
    info!("{} has disconnected", handle);
    info!("Current connections: {}", server.connection_count().await);
}

/// Run the handshake: one ClientRequestConnection frame, then a
/// ConnectionFailure/ClientChangeNick loop until a free handle is
/// registered. Returns None when the connection must be dropped.
async fn negotiate_handle<R>(
    reader: &mut R,
    tx: &mpsc::UnboundedSender<Message>,
    remote_addr: SocketAddr,
    server: &SharedServerManager,
    config: &ServerConfig,
) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let first = match timeout(config.handshake_timeout, codec::read_frame(reader)).await {
        Ok(Ok(msg)) => msg,
        _ => {
            debug!("Handshake read from {} failed", remote_addr);
            return None;
        }
    };

    // Non-protocol clients are dropped without a reply
    if first.opcode != OpCode::ClientRequestConnection {
        debug!(
            "Dropping {}: expected connection request, got {:?}",
            remote_addr, first.opcode
        );
        return None;
    }

    let mut handle = first.body;
    loop {
        let connection = Connection::new(remote_addr, tx.clone());
        match server.register_client(&handle, connection).await {
            Ok(()) => {
                let success = Message::from_server(
                    OpCode::ConnectionSuccess,
                    &handle,
                    "Connection established",
                );
                let _ = tx.send(success);
                return Some(handle);
            }
            Err(e @ ParleyError::DuplicateHandle(_)) | Err(e @ ParleyError::InvalidHandle) => {
                warn!("Registration of {:?} from {} rejected: {}", handle, remote_addr, e);
                let failure =
                    Message::from_server(OpCode::ConnectionFailure, &handle, &e.to_string());
                let _ = tx.send(failure);
            }
            Err(e) => {
                warn!("Registration of {:?} from {} failed: {}", handle, remote_addr, e);
                return None;
            }
        }

        // Only a nick change continues the negotiation
        match timeout(config.handshake_timeout, codec::read_frame(reader)).await {
            Ok(Ok(msg)) if msg.opcode == OpCode::ClientChangeNick => {
                handle = msg.body;
            }
            Ok(Ok(msg)) => {
                debug!(
                    "Aborting handshake with {}: got {:?} instead of nick change",
                    remote_addr, msg.opcode
                );
                return None;
            }
            _ => {
                debug!("Handshake with {} ended before completion", remote_addr);
                return None;
            }
        }
    }
}
