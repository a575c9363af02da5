//! Unit tests for `WsManager`.
//!
//! These exercise the connection manager directly, without HTTP upgrades:
//! add/remove semantics, broadcast delivery, liveness eviction and
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use jobtrace_api::ws::{start_heartbeat, WsManager};

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();

    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();

    let (_rx, _) = manager.add("conn-1".to_string()).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn send_to_targets_one_connection() {
    let manager = WsManager::new();
    let (mut rx1, _) = manager.add("conn-1".to_string()).await;
    let (mut rx2, _) = manager.add("conn-2".to_string()).await;

    assert!(manager.send_to("conn-1", Message::Text("only you".into())).await);
    assert!(!manager.send_to("missing", Message::Text("nobody".into())).await);

    let msg = rx1.recv().await.expect("rx1 should receive message");
    assert!(matches!(&msg, Message::Text(t) if *t == "only you"));
    assert!(rx2.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Broadcast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_sends_to_all_connections() {
    let manager = WsManager::new();

    let (mut rx1, _) = manager.add("conn-1".to_string()).await;
    let (mut rx2, _) = manager.add("conn-2".to_string()).await;

    manager.broadcast(Message::Text("hello everyone".into())).await;

    let msg1 = rx1.recv().await.expect("rx1 should receive broadcast");
    let msg2 = rx2.recv().await.expect("rx2 should receive broadcast");
    assert!(matches!(&msg1, Message::Text(t) if *t == "hello everyone"));
    assert!(matches!(&msg2, Message::Text(t) if *t == "hello everyone"));
}

#[tokio::test]
async fn broadcast_skips_closed_channels() {
    let manager = WsManager::new();

    let (rx1, _) = manager.add("conn-1".to_string()).await;
    let (mut rx2, _) = manager.add("conn-2".to_string()).await;
    drop(rx1);

    manager.broadcast(Message::Text("still alive".into())).await;

    let msg = rx2.recv().await.expect("rx2 should receive broadcast");
    assert!(matches!(&msg, Message::Text(t) if *t == "still alive"));
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_probe_pings_everyone_and_evicts_nobody() {
    let manager = WsManager::new();
    let (mut rx, _) = manager.add("conn-1".to_string()).await;

    assert_eq!(manager.probe_and_evict().await, 0);
    assert_eq!(manager.connection_count().await, 1);

    let msg = rx.recv().await.expect("should receive Ping");
    assert!(matches!(msg, Message::Ping(_)), "Expected Ping, got: {msg:?}");
}

#[tokio::test]
async fn client_without_pong_is_evicted_on_next_probe() {
    let manager = WsManager::new();
    let (mut silent, _) = manager.add("silent".to_string()).await;
    let (mut responsive, _) = manager.add("responsive".to_string()).await;

    manager.probe_and_evict().await;
    manager.mark_alive("responsive").await;

    assert_eq!(manager.probe_and_evict().await, 1);
    assert_eq!(manager.connection_count().await, 1);

    // Ping then Close, then the channel is gone.
    assert!(matches!(silent.recv().await, Some(Message::Ping(_))));
    assert!(matches!(silent.recv().await, Some(Message::Close(None))));
    assert!(silent.recv().await.is_none());

    // Two Pings, no Close.
    assert!(matches!(responsive.recv().await, Some(Message::Ping(_))));
    assert!(matches!(responsive.recv().await, Some(Message::Ping(_))));
    assert!(responsive.try_recv().is_err());
}

#[tokio::test]
async fn pong_must_arrive_every_cycle() {
    let manager = WsManager::new();
    let (_rx, _) = manager.add("conn-1".to_string()).await;

    manager.probe_and_evict().await;
    manager.mark_alive("conn-1").await;
    assert_eq!(manager.probe_and_evict().await, 0);

    // No Pong for the second Ping.
    assert_eq!(manager.probe_and_evict().await, 1);
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn eviction_cancels_only_the_evicted_connection() {
    let manager = WsManager::new();
    let (_silent, silent_closed) = manager.add("silent".to_string()).await;
    let (_responsive, responsive_closed) = manager.add("responsive".to_string()).await;

    manager.probe_and_evict().await;
    manager.mark_alive("responsive").await;
    manager.probe_and_evict().await;

    assert!(silent_closed.is_cancelled());
    assert!(!responsive_closed.is_cancelled());
}

#[tokio::test]
async fn heartbeat_with_zero_interval_keeps_running() {
    let manager = Arc::new(WsManager::new());
    let (mut rx, _) = manager.add("conn-1".to_string()).await;

    let handle = start_heartbeat(Arc::clone(&manager), Duration::ZERO);

    let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("heartbeat should ping within the timeout");
    assert!(matches!(msg, Some(Message::Ping(_))), "Expected Ping, got: {msg:?}");
    assert!(!handle.is_finished(), "Heartbeat task should still be alive");

    handle.abort();
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();

    let (mut rx1, closed1) = manager.add("conn-1".to_string()).await;
    let (mut rx2, closed2) = manager.add("conn-2".to_string()).await;

    manager.shutdown_all().await;
    assert_eq!(manager.connection_count().await, 0);
    assert!(closed1.is_cancelled() && closed2.is_cancelled());

    let msg1 = rx1.recv().await.expect("rx1 should receive Close");
    let msg2 = rx2.recv().await.expect("rx2 should receive Close");
    assert!(matches!(msg1, Message::Close(None)), "Expected Close(None), got: {msg1:?}");
    assert!(matches!(msg2, Message::Close(None)), "Expected Close(None), got: {msg2:?}");

    assert!(rx1.recv().await.is_none(), "Channel should be closed after shutdown");
}
