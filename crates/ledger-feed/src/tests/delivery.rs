//! Event delivery and handler isolation tests.

use crate::tests::harness::{wait_until, MockFeedServer};
use crate::{BackoffPolicy, FeedClient, FeedConfig, FeedLifecycle};
use ledger_protocol_types::EventKind;
use ledger_session::{Credential, SessionStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn connected_client(server: &MockFeedServer) -> FeedClient {
    let session = Arc::new(SessionStore::in_memory());
    session.set_credential(Credential::new("feed-token"));

    let client = FeedClient::new(
        FeedConfig {
            url: server.url(),
            backoff: BackoffPolicy {
                floor_ms: 10,
                cap_ms: 40,
            },
        },
        session,
    );

    let mut lifecycle = client.subscribe_lifecycle();
    client.connect().unwrap();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), lifecycle.recv())
            .await
            .expect("timed out waiting for connect")
            .expect("lifecycle channel closed");
        if event == FeedLifecycle::Connected {
            return client;
        }
    }
}

#[tokio::test]
async fn events_reach_registered_handler() {
    let server = MockFeedServer::start().await;
    let client = connected_client(&server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    client.on(EventKind::TransactionCreated, move |event| {
        seen_clone.lock().unwrap().push(event.data.clone());
    });

    server.push_event("transaction_created", serde_json::json!({"id": 11}));

    assert!(wait_until(|| seen.lock().unwrap().len() == 1).await);
    assert_eq!(
        seen.lock().unwrap()[0],
        Some(serde_json::json!({"id": 11}))
    );

    client.close();
}

#[tokio::test]
async fn same_kind_events_preserve_arrival_order() {
    let server = MockFeedServer::start().await;
    let client = connected_client(&server).await;

    let totals = Arc::new(Mutex::new(Vec::new()));
    let totals_clone = totals.clone();
    client.on(EventKind::OutstandingTotal, move |event| {
        let total = event.data.as_ref().unwrap()["total"].as_i64().unwrap();
        totals_clone.lock().unwrap().push(total);
    });

    for i in 0..20 {
        server.push_event("outstanding_total", serde_json::json!({"total": i}));
    }

    assert!(wait_until(|| totals.lock().unwrap().len() == 20).await);
    assert_eq!(*totals.lock().unwrap(), (0..20).collect::<Vec<i64>>());

    client.close();
}

#[tokio::test]
async fn panicking_handler_does_not_stop_delivery() {
    let server = MockFeedServer::start().await;
    let client = connected_client(&server).await;

    let survivor = Arc::new(Mutex::new(0));
    client.on(EventKind::PartyCreated, |_| {
        panic!("handler bug");
    });
    let survivor_clone = survivor.clone();
    client.on(EventKind::PartyCreated, move |_| {
        *survivor_clone.lock().unwrap() += 1;
    });

    for _ in 0..3 {
        server.push_event("party_created", serde_json::json!({}));
    }

    // The later handler sees every event despite the first panicking each
    // time.
    assert!(wait_until(|| *survivor.lock().unwrap() == 3).await);

    client.close();
}

#[tokio::test]
async fn undecodable_frames_are_skipped() {
    let server = MockFeedServer::start().await;
    let client = connected_client(&server).await;

    let seen = Arc::new(Mutex::new(0));
    let seen_clone = seen.clone();
    client.on(EventKind::PartyUpdated, move |_| {
        *seen_clone.lock().unwrap() += 1;
    });

    server.push("not json at all");
    server.push(r#"{"type":"party_exploded","data":{}}"#);
    server.push_event("party_updated", serde_json::json!({"id": 2}));

    assert!(wait_until(|| *seen.lock().unwrap() == 1).await);
    assert!(client.is_connected());

    client.close();
}

#[tokio::test]
async fn unregistered_handler_stops_receiving() {
    let server = MockFeedServer::start().await;
    let client = connected_client(&server).await;

    let seen = Arc::new(Mutex::new(0));
    let seen_clone = seen.clone();
    let id = client.on(EventKind::TransactionDeleted, move |_| {
        *seen_clone.lock().unwrap() += 1;
    });

    server.push_event("transaction_deleted", serde_json::json!({"id": 1}));
    assert!(wait_until(|| *seen.lock().unwrap() == 1).await);

    assert!(client.off(EventKind::TransactionDeleted, id));
    server.push_event("transaction_deleted", serde_json::json!({"id": 2}));

    // Give the frame time to arrive; the count must not move.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*seen.lock().unwrap(), 1);

    client.close();
}
