//! End-to-end scenarios over real TCP connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

use parley::config::ServerConfig;
use parley::core::server::ServerManager;
use parley::handlers::client::handle_client;
use parley::protocol::{codec, Message, OpCode};

fn test_config(idle_timeout: Duration) -> ServerConfig {
    ServerConfig {
        handshake_timeout: Duration::from_secs(2),
        idle_timeout,
        ..ServerConfig::default()
    }
}

async fn start_server(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(ServerManager::new());

    tokio::spawn(async move {
        loop {
            let Ok((stream, remote_addr)) = listener.accept().await else {
                break;
            };
            let server = server.clone();
            let config = config.clone();
            tokio::spawn(handle_client(stream, remote_addr, server, config));
        }
    });
    addr
}

/// Read frames until one matches, skipping interleaved notices
async fn read_until<F>(stream: &mut TcpStream, pred: F) -> Message
where
    F: Fn(&Message) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let msg = codec::read_frame(stream).await.expect("stream closed while waiting");
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .expect("expected frame was not received")
}

async fn send(stream: &mut TcpStream, opcode: OpCode, sender: &str, receiver: &str, body: &str) {
    let msg = Message::new(opcode, sender, receiver, body);
    codec::write_frame(stream, &msg).await.unwrap();
}

/// Connect and complete the handshake with the given handle
async fn connect_as(addr: SocketAddr, handle: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    send(&mut stream, OpCode::ClientRequestConnection, handle, "server", handle).await;
    read_until(&mut stream, |m| m.opcode == OpCode::ConnectionSuccess).await;
    stream
}

#[tokio::test]
async fn test_duplicate_nick_negotiation() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let _alice = connect_as(addr, "alice").await;

    // second client asking for the same handle is asked to change it
    let mut other = TcpStream::connect(addr).await.unwrap();
    send(&mut other, OpCode::ClientRequestConnection, "alice", "server", "alice").await;

    let failure = read_until(&mut other, |m| m.opcode == OpCode::ConnectionFailure).await;
    assert!(failure.body.contains("nickname exists"));

    send(&mut other, OpCode::ClientChangeNick, "alice", "server", "alice2").await;
    let success = read_until(&mut other, |m| m.opcode == OpCode::ConnectionSuccess).await;
    assert_eq!(success.receiver, "alice2");
}

#[tokio::test]
async fn test_room_broadcast_includes_sender_and_members() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    send(&mut alice, OpCode::ClientCreateRoom, "alice", "server", "team").await;
    read_until(&mut alice, |m| m.body.contains("created")).await;

    let mut bob = connect_as(addr, "bob").await;
    send(&mut bob, OpCode::ClientJoinRoom, "bob", "server", "team").await;
    read_until(&mut bob, |m| m.body.contains("You joined")).await;

    send(&mut alice, OpCode::ClientSendPubMessage, "alice", "team", "hi").await;

    let received = read_until(&mut bob, |m| {
        m.opcode == OpCode::ServerBroadcastMessage && m.body == "hi"
    })
    .await;
    assert_eq!(received.sender, "alice");
    assert_eq!(received.receiver, "team");

    // inclusive policy: the sender hears its own broadcast
    read_until(&mut alice, |m| {
        m.opcode == OpCode::ServerBroadcastMessage && m.body == "hi"
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_to_missing_room_reports_error() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    send(&mut alice, OpCode::ClientSendPubMessage, "alice", "nowhere", "hi").await;

    let reply = read_until(&mut alice, |m| m.opcode == OpCode::ServerTellMessage).await;
    assert!(reply.body.contains("doesn't exist"));
}

#[tokio::test]
async fn test_direct_message_delivery_and_ghost_receiver() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    let mut bob = connect_as(addr, "bob").await;

    send(&mut alice, OpCode::ClientSendMessage, "alice", "bob", "psst").await;
    let received = read_until(&mut bob, |m| {
        m.opcode == OpCode::ServerTellMessage && m.body == "psst"
    })
    .await;
    assert_eq!(received.sender, "alice");

    // no crash, just an error reply
    send(&mut alice, OpCode::ClientSendMessage, "alice", "ghost", "anyone?").await;
    let reply = read_until(&mut alice, |m| {
        m.opcode == OpCode::ServerTellMessage && m.body.contains("ghost")
    })
    .await;
    assert!(reply.body.contains("doesn't exist"));
}

#[tokio::test]
async fn test_ping_is_acknowledged() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    send(&mut alice, OpCode::ConnectionPing, "alice", "server", "ping").await;

    let ack = read_until(&mut alice, |m| m.opcode == OpCode::ConnectionAck).await;
    assert_eq!(ack.body, "pong");
}

#[tokio::test]
async fn test_room_listing_and_membership_queries() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    send(&mut alice, OpCode::ClientCreateRoom, "alice", "server", "team").await;
    read_until(&mut alice, |m| m.body.contains("created")).await;

    send(&mut alice, OpCode::ClientListRoom, "alice", "server", "").await;
    let rooms = read_until(&mut alice, |m| m.opcode == OpCode::ServerRplListRoom).await;
    assert!(rooms.body.contains("public"));
    assert!(rooms.body.contains("team"));

    send(&mut alice, OpCode::ClientListMember, "alice", "server", "team").await;
    let members = read_until(&mut alice, |m| m.opcode == OpCode::ServerRplListMember).await;
    assert!(members.body.contains("alice"));

    send(&mut alice, OpCode::ClientInRoom, "alice", "server", "team").await;
    let in_room = read_until(&mut alice, |m| m.opcode == OpCode::ServerRplClientInRoom).await;
    assert_eq!(in_room.body, "team");

    // not a member of a room someone else owns
    let mut bob = connect_as(addr, "bob").await;
    send(&mut bob, OpCode::ClientInRoom, "bob", "server", "team").await;
    let reply = read_until(&mut bob, |m| m.opcode == OpCode::ServerTellMessage).await;
    assert!(reply.body.contains("not a member"));

    // unknown room
    send(&mut bob, OpCode::ClientListMember, "bob", "server", "nowhere").await;
    let reply = read_until(&mut bob, |m| m.opcode == OpCode::ServerTellMessage).await;
    assert!(reply.body.contains("doesn't exist"));
}

#[tokio::test]
async fn test_idle_timeout_closes_and_frees_handle() {
    let addr = start_server(test_config(Duration::from_millis(500))).await;

    let mut alice = connect_as(addr, "alice").await;

    // send nothing and wait out the idle window
    let closed = read_until(&mut alice, |m| m.opcode == OpCode::ConnectionClosed).await;
    assert!(closed.body.contains("closed"));

    // the close notice is queued just before deregistration; give the
    // cleanup a moment, then the handle can be taken again
    sleep(Duration::from_millis(100)).await;
    let _alice_again = connect_as(addr, "alice").await;
}

#[tokio::test]
async fn test_abrupt_disconnect_cleans_up_rooms() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    send(&mut alice, OpCode::ClientCreateRoom, "alice", "server", "team").await;
    read_until(&mut alice, |m| m.body.contains("created")).await;

    // no ConnectionClosed frame, just a dead socket
    drop(alice);

    let mut bob = connect_as(addr, "bob").await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        send(&mut bob, OpCode::ClientListRoom, "bob", "server", "").await;
        let rooms = read_until(&mut bob, |m| m.opcode == OpCode::ServerRplListRoom).await;
        if !rooms.body.contains("team") {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "room of a disconnected last member was not deleted"
        );
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_graceful_close_request() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut alice = connect_as(addr, "alice").await;
    send(&mut alice, OpCode::ConnectionClosed, "alice", "server", "").await;

    read_until(&mut alice, |m| m.opcode == OpCode::ConnectionClosed).await;

    // handle released after the graceful close
    sleep(Duration::from_millis(100)).await;
    let _alice_again = connect_as(addr, "alice").await;
}

#[tokio::test]
async fn test_non_protocol_first_frame_is_dropped_silently() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send(&mut stream, OpCode::ConnectionPing, "nobody", "server", "ping").await;

    // no reply: the next read observes the dropped connection
    let result = timeout(Duration::from_secs(5), codec::read_frame(&mut stream)).await;
    assert!(matches!(result, Ok(Err(_))), "expected a silent drop, got {:?}", result);
}

#[tokio::test]
async fn test_handshake_abort_on_unexpected_opcode() {
    let addr = start_server(test_config(Duration::from_secs(30))).await;

    let _alice = connect_as(addr, "alice").await;

    let mut other = TcpStream::connect(addr).await.unwrap();
    send(&mut other, OpCode::ClientRequestConnection, "alice", "server", "alice").await;
    read_until(&mut other, |m| m.opcode == OpCode::ConnectionFailure).await;

    // anything but a nick change aborts the negotiation
    send(&mut other, OpCode::ClientListRoom, "alice", "server", "").await;
    let result = timeout(Duration::from_secs(5), codec::read_frame(&mut other)).await;
    assert!(matches!(result, Ok(Err(_))));
}
