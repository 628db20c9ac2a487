use std::sync::Arc;
use tokio::sync::mpsc;

use parley::core::connection::Connection;
use parley::core::server::ServerManager;
use parley::protocol::Message;

fn connection() -> (Connection, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Connection::new("127.0.0.1:9000".parse().unwrap(), tx), rx)
}

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let server = Arc::new(ServerManager::new());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            let (conn, _rx) = connection();
            server.register_client("alice", conn).await.is_ok()
        }));
    }

    let mut successes = 0;
    for task in handles {
        if task.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1, "exactly one registration may win");
    assert_eq!(server.connection_count().await, 1);
}

#[tokio::test]
async fn test_handle_is_free_again_after_unregister() {
    let server = ServerManager::new();

    let (conn, _rx) = connection();
    server.register_client("alice", conn).await.unwrap();

    let (conn, _rx) = connection();
    assert!(server.register_client("alice", conn).await.is_err());

    server.unregister_client("alice").await;

    let (conn, _rx) = connection();
    assert!(server.register_client("alice", conn).await.is_ok());
}

#[tokio::test]
async fn test_unregister_absent_handle_is_noop() {
    let server = ServerManager::new();
    server.unregister_client("ghost").await;
    assert_eq!(server.connection_count().await, 0);
}

#[tokio::test]
async fn test_registration_joins_default_room() {
    let server = ServerManager::new();

    let (conn, _rx) = connection();
    server.register_client("alice", conn).await.unwrap();

    assert!(server.is_member("public", "alice").await.unwrap());

    server.unregister_client("alice").await;
    assert!(!server.is_member("public", "alice").await.unwrap());
}

#[tokio::test]
async fn test_session_snapshot_lists_connected_handles() {
    let server = ServerManager::new();

    let (conn, _rx) = connection();
    server.register_client("alice", conn).await.unwrap();
    let (conn, _rx) = connection();
    server.register_client("bob", conn).await.unwrap();

    let mut snapshot = server.session_snapshot().await;
    snapshot.sort();
    assert_eq!(snapshot, vec!["alice".to_string(), "bob".to_string()]);
}
