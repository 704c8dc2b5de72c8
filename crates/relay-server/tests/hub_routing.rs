// crates/relay-server/tests/hub_routing.rs
//
// Drives the hub loop directly through its handle, standing in for the
// reader/writer tasks with bare channels. `peer_count` doubles as an
// ordering barrier: the hub processes events one at a time, so once a
// count query answers, every event submitted before it has been applied.

use std::collections::HashSet;

use relay_core::ConnId;
use relay_server::hub::{self, HubHandle};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

async fn join(hub: &HubHandle, name: &str, capacity: usize) -> (ConnId, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity);
    let id = hub
        .register(Some(name.to_string()), tx)
        .await
        .expect("registration failed");
    (id, rx)
}

async fn recv_text(rx: &mut mpsc::Receiver<String>) -> String {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("queue closed unexpectedly")
}

/// Wait until every previously submitted event has been processed.
async fn settle(hub: &HubHandle) -> usize {
    hub.peer_count().await.expect("hub is gone")
}

#[tokio::test]
async fn identities_are_unique_across_concurrent_registrations() {
    let hub = hub::start();

    let mut handles = Vec::new();
    for i in 0..16 {
        let hub = hub.clone();
        handles.push(tokio::spawn(async move {
            let (tx, rx) = mpsc::channel(8);
            let id = hub
                .register(Some(format!("peer-{}", i)), tx)
                .await
                .expect("registration failed");
            // Keep the queue alive so the peer stays registered.
            (id, rx)
        }));
    }

    let mut ids = HashSet::new();
    let mut queues = Vec::new();
    for handle in handles {
        let (id, rx) = handle.await.expect("registration task panicked");
        assert!(ids.insert(id), "identity {} was assigned twice", id);
        queues.push(rx);
    }

    assert_eq!(ids.len(), 16);
    assert_eq!(settle(&hub).await, 16);
}

#[tokio::test]
async fn broadcast_reaches_everyone_but_the_sender() {
    let hub = hub::start();

    let (a, mut rx_a) = join(&hub, "alice", 8).await;
    let (_b, mut rx_b) = join(&hub, "bob", 8).await;
    let (_c, mut rx_c) = join(&hub, "carol", 8).await;

    hub.dispatch(a, "whoever::hello room".to_string()).unwrap();
    settle(&hub).await;

    assert_eq!(recv_text(&mut rx_b).await, "alice: hello room");
    assert_eq!(recv_text(&mut rx_c).await, "alice: hello room");
    assert!(rx_a.try_recv().is_err(), "sender received its own broadcast");
}

#[tokio::test]
async fn anonymous_peers_broadcast_under_the_default_name() {
    let hub = hub::start();

    let (tx, _rx_anon) = mpsc::channel(8);
    let anon = hub.register(None, tx).await.unwrap();
    let (_b, mut rx_b) = join(&hub, "bob", 8).await;

    hub.dispatch(anon, "::hi".to_string()).unwrap();
    settle(&hub).await;

    assert_eq!(recv_text(&mut rx_b).await, "Client: hi");
}

#[tokio::test]
async fn unicast_reaches_only_the_target() {
    let hub = hub::start();

    let (a, mut rx_a) = join(&hub, "alice", 8).await;
    let (b, mut rx_b) = join(&hub, "bob", 8).await;
    let (_c, mut rx_c) = join(&hub, "carol", 8).await;

    hub.dispatch(a, format!("me:{}:psst", b)).unwrap();
    settle(&hub).await;

    assert_eq!(recv_text(&mut rx_b).await, "psst");
    assert!(rx_a.try_recv().is_err());
    assert!(rx_c.try_recv().is_err());
}

#[tokio::test]
async fn unknown_recipient_is_dropped_without_side_effects() {
    let hub = hub::start();

    let (a, _rx_a) = join(&hub, "alice", 8).await;
    let (_b, mut rx_b) = join(&hub, "bob", 8).await;

    hub.dispatch(a, "me:999:lost".to_string()).unwrap();
    assert_eq!(settle(&hub).await, 2, "registrations were disturbed");
    assert!(rx_b.try_recv().is_err());

    // Routing still works afterwards.
    hub.dispatch(a, "::still alive".to_string()).unwrap();
    settle(&hub).await;
    assert_eq!(recv_text(&mut rx_b).await, "alice: still alive");
}

#[tokio::test]
async fn malformed_lines_are_discarded() {
    let hub = hub::start();

    let (a, _rx_a) = join(&hub, "alice", 8).await;
    let (_b, mut rx_b) = join(&hub, "bob", 8).await;

    hub.dispatch(a, "no separators at all".to_string()).unwrap();
    hub.dispatch(a, "alice:bob:named recipient".to_string()).unwrap();
    hub.dispatch(a, "alice:2".to_string()).unwrap();
    settle(&hub).await;

    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn slow_peer_is_evicted_and_the_rest_keep_flowing() {
    let hub = hub::start();

    let (a, _rx_a) = join(&hub, "alice", 8).await;
    // Bob never drains his queue and it only holds one message.
    let (b, mut rx_b) = join(&hub, "bob", 1).await;
    let (_c, mut rx_c) = join(&hub, "carol", 8).await;

    hub.dispatch(a, "::one".to_string()).unwrap();
    hub.dispatch(a, "::two".to_string()).unwrap();

    // Bob's queue was full on the second delivery, so he is gone.
    assert_eq!(settle(&hub).await, 2);

    // Carol saw everything, promptly.
    assert_eq!(recv_text(&mut rx_c).await, "alice: one");
    assert_eq!(recv_text(&mut rx_c).await, "alice: two");

    // Bob got the first message, then his queue was closed.
    assert_eq!(recv_text(&mut rx_b).await, "alice: one");
    assert!(timeout(Duration::from_secs(1), rx_b.recv())
        .await
        .expect("timed out")
        .is_none());

    // Further dispatches skip the evicted peer entirely.
    hub.dispatch(a, format!("me:{}:anyone home", b)).unwrap();
    hub.dispatch(a, "::three".to_string()).unwrap();
    settle(&hub).await;
    assert_eq!(recv_text(&mut rx_c).await, "alice: three");
}

#[tokio::test]
async fn teardown_is_idempotent() {
    let hub = hub::start();

    let (a, _rx_a) = join(&hub, "alice", 8).await;
    let (b, mut rx_b) = join(&hub, "bob", 8).await;

    // Two teardown triggers racing (reader exit and eviction) both end
    // up here; the second must be a no-op.
    hub.unregister(b).unwrap();
    hub.unregister(b).unwrap();
    assert_eq!(settle(&hub).await, 1);

    // Bob's queue is closed exactly once.
    assert!(timeout(Duration::from_secs(1), rx_b.recv())
        .await
        .expect("timed out")
        .is_none());

    // The hub still routes for everyone else.
    let (_c, mut rx_c) = join(&hub, "carol", 8).await;
    hub.dispatch(a, "::over here".to_string()).unwrap();
    settle(&hub).await;
    assert_eq!(recv_text(&mut rx_c).await, "alice: over here");
}

#[tokio::test]
async fn lines_from_a_retired_peer_are_dropped() {
    let hub = hub::start();

    let (a, _rx_a) = join(&hub, "alice", 8).await;
    let (_b, mut rx_b) = join(&hub, "bob", 8).await;

    hub.unregister(a).unwrap();
    // A late read racing the eviction: the line arrives after the
    // sender is already gone.
    hub.dispatch(a, "::ghost".to_string()).unwrap();
    settle(&hub).await;

    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn deliveries_preserve_per_sender_order() {
    let hub = hub::start();

    let (a, _rx_a) = join(&hub, "alice", 64).await;
    let (_b, mut rx_b) = join(&hub, "bob", 64).await;

    for i in 0..20 {
        hub.dispatch(a, format!("::message {}", i)).unwrap();
    }
    settle(&hub).await;

    for i in 0..20 {
        assert_eq!(recv_text(&mut rx_b).await, format!("alice: message {}", i));
    }
}
