//! Message router: opcode dispatch for established connections

use log::{debug, info, warn};

use crate::core::server::SharedServerManager;
use crate::error::ParleyError;
use crate::protocol::{Message, OpCode};

/// Tells the connection handler whether to keep its request loop going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Handles decoded client requests and routes them through the
/// registries. The Active session's handle is the authoritative sender;
/// whatever the client wrote into the frame's sender field is replaced.
pub struct MessageHandler {
    server: SharedServerManager,
}

impl MessageHandler {
    /// Create a new message handler
    pub fn new(server: SharedServerManager) -> Self {
        Self { server }
    }

    /// Process one request frame from an Active connection
    pub async fn handle_request(&self, handle: &str, mut msg: Message) -> Flow {
        msg.sender = handle.to_string();

        match msg.opcode {
            OpCode::ClientSendPubMessage => self.broadcast_message(handle, msg).await,
            OpCode::ClientSendMessage => self.direct_message(handle, msg).await,
            OpCode::ConnectionPing => {
                self.reply(handle, OpCode::ConnectionAck, "pong").await;
            }
            OpCode::ClientCreateRoom => self.create_room(handle, &msg.body).await,
            OpCode::ClientJoinRoom => self.join_room(handle, &msg.body).await,
            OpCode::ClientLeaveRoom => self.leave_room(handle, &msg.body).await,
            OpCode::ClientListRoom => {
                let rooms = self.server.list_rooms().await;
                self.reply(handle, OpCode::ServerRplListRoom, &rooms.join(", "))
                    .await;
            }
            OpCode::ClientListMember => self.list_members(handle, &msg.body).await,
            OpCode::ClientInRoom => self.in_room(handle, &msg.body).await,
            OpCode::ConnectionClosed => {
                info!("{} requested connection close", handle);
                return Flow::Close;
            }
            OpCode::ClientChangeNick => {
                // renaming is only part of the handshake negotiation
                debug!("{} sent ClientChangeNick outside handshake, ignoring", handle);
            }
            OpCode::Error => {
                // internal sentinel; a peer putting it on the wire is
                // not speaking the protocol
                warn!("{} sent the internal error opcode, closing", handle);
                return Flow::Close;
            }
            other => {
                debug!("{} sent unexpected opcode {:?}, ignoring", handle, other);
            }
        }
        Flow::Continue
    }

    /// Forward a room message to every member of the named room. The
    /// sender receives its own broadcast; the server pseudo-member
    /// never does.
    async fn broadcast_message(&self, handle: &str, msg: Message) {
        let room_name = msg.receiver.clone();
        let broadcast = msg.relabeled(OpCode::ServerBroadcastMessage);

        match self.server.broadcast_to_room(&room_name, &broadcast, None).await {
            Ok(count) => debug!("Broadcast from {} reached {} members of {}", handle, count, room_name),
            Err(e) => self.reply_error(handle, e).await,
        }
    }

    /// Forward a direct message to the named receiver's session
    async fn direct_message(&self, handle: &str, msg: Message) {
        let receiver = msg.receiver.clone();
        let tell = msg.relabeled(OpCode::ServerTellMessage);

        if self.server.send_to_user(&receiver, tell).await.is_err() {
            self.reply_error(handle, ParleyError::ReceiverNotFound(receiver))
                .await;
        }
    }

    async fn create_room(&self, handle: &str, room_name: &str) {
        match self.server.create_room(room_name, handle).await {
            Ok(()) => {
                self.reply(
                    handle,
                    OpCode::ServerTellMessage,
                    &format!("Room {} created!", room_name),
                )
                .await;
            }
            Err(e) => self.reply_error(handle, e).await,
        }
    }

    async fn join_room(&self, handle: &str, room_name: &str) {
        match self.server.join_room(handle, room_name).await {
            Ok(()) => {
                self.reply(
                    handle,
                    OpCode::ServerTellMessage,
                    &format!("You joined {}!", room_name),
                )
                .await;
            }
            Err(e) => self.reply_error(handle, e).await,
        }
    }

    async fn leave_room(&self, handle: &str, room_name: &str) {
        match self.server.leave_room(handle, room_name).await {
            Ok(()) => {
                self.reply(
                    handle,
                    OpCode::ServerTellMessage,
                    &format!("you have left the room {}", room_name),
                )
                .await;
            }
            Err(e) => self.reply_error(handle, e).await,
        }
    }

    async fn list_members(&self, handle: &str, room_name: &str) {
        match self.server.list_members(room_name).await {
            Ok(members) => {
                self.reply(handle, OpCode::ServerRplListMember, &members.join(", "))
                    .await;
            }
            Err(e) => self.reply_error(handle, e).await,
        }
    }

    async fn in_room(&self, handle: &str, room_name: &str) {
        match self.server.is_member(room_name, handle).await {
            Ok(true) => {
                self.reply(handle, OpCode::ServerRplClientInRoom, room_name)
                    .await;
            }
            Ok(false) => {
                self.reply(handle, OpCode::ServerTellMessage, "not a member of the room")
                    .await;
            }
            Err(e) => self.reply_error(handle, e).await,
        }
    }

    /// Send a server-originated reply to the requesting client, with
    /// failures logged rather than propagated
    async fn reply(&self, handle: &str, opcode: OpCode, body: &str) {
        let msg = Message::from_server(opcode, handle, body);
        if let Err(e) = self.server.send_to_user(handle, msg).await {
            warn!("Failed to send reply to {}: {}", handle, e);
        }
    }

    /// Report a recoverable failure back to the requesting client as
    /// plain reply text
    async fn reply_error(&self, handle: &str, err: ParleyError) {
        self.reply(handle, OpCode::ServerTellMessage, &err.to_string())
            .await;
    }
}
