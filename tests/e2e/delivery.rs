//! Delivery flow: single upload, handle reuse and failure handling.

use super::TestHarness;
use channel_gate::artifact::ArtifactHandle;
use channel_gate::{GateEvent, Presentation};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_verified_requester_receives_artifact() {
    let mut harness = TestHarness::setup();
    harness.join_both(42);

    assert_eq!(harness.controller.on_verify_request(42).await, Presentation::Unlocked);
    assert_eq!(
        harness.controller.on_deliver_request(42, 42).await,
        Presentation::ArtifactSent
    );

    assert_eq!(harness.store.uploads(), 1);
    let handle = harness.controller.cache().handle().cloned().expect("cached handle");
    assert_eq!(harness.store.sent(), vec![(handle.clone(), 42)]);

    let _verified = harness.events.recv().await.expect("verification event");
    assert_eq!(
        harness.events.recv().await.expect("upload event"),
        GateEvent::ArtifactUploaded {
            handle: handle.to_string(),
        }
    );
    assert_eq!(
        harness.events.recv().await.expect("delivery event"),
        GateEvent::ArtifactDelivered {
            requester: 42,
            cached: false,
        }
    );
}

#[tokio::test]
async fn test_later_deliveries_reuse_handle() {
    let mut harness = TestHarness::setup();

    for id in 1..=10 {
        assert_eq!(
            harness.controller.on_deliver_request(id, id).await,
            Presentation::ArtifactSent
        );
    }

    assert_eq!(harness.store.uploads(), 1);
    let sent = harness.store.sent();
    assert_eq!(sent.len(), 10);
    assert!(sent.iter().all(|(handle, _)| *handle == sent[0].0));
    assert_eq!(harness.controller.cache().stats().hits, 9);

    let cached_deliveries = std::iter::from_fn(|| harness.events.try_recv().ok())
        .filter(|event| matches!(event, GateEvent::ArtifactDelivered { cached: true, .. }))
        .count();
    assert_eq!(cached_deliveries, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_deliveries_upload_once() {
    let harness = TestHarness::setup();
    harness.store.set_upload_delay(Duration::from_millis(50));

    let tasks: Vec<_> = (0..16)
        .map(|id| {
            let controller = Arc::clone(&harness.controller);
            tokio::spawn(async move { controller.on_deliver_request(id, id).await })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        assert_eq!(task.expect("join"), Presentation::ArtifactSent);
    }

    assert_eq!(harness.store.uploads(), 1);
    let sent = harness.store.sent();
    assert_eq!(sent.len(), 16);
    let expected = ArtifactHandle::new("file-0-9");
    assert!(sent.iter().all(|(handle, _)| *handle == expected));
}

#[tokio::test]
async fn test_missing_artifact_fails_without_caching() {
    let harness = TestHarness::setup_with(Duration::from_secs(3), false);

    assert_eq!(
        harness.controller.on_deliver_request(1, 1).await,
        Presentation::DeliveryFailed
    );
    assert!(!harness.controller.cache().is_cached());
    assert!(harness.store.sent().is_empty());

    // The file appears later; the next request starts over and succeeds
    std::fs::write(&harness.artifact_path, b"apk-bytes").expect("write artifact");

    assert_eq!(
        harness.controller.on_deliver_request(1, 1).await,
        Presentation::ArtifactSent
    );
    assert_eq!(harness.store.uploads(), 2);
    assert_eq!(
        harness.controller.cache().handle(),
        Some(&ArtifactHandle::new("file-1-9"))
    );
}

#[tokio::test]
async fn test_rejected_send_keeps_cached_handle() {
    let harness = TestHarness::setup();
    harness.store.reject_sends(true);

    assert_eq!(
        harness.controller.on_deliver_request(5, 5).await,
        Presentation::DeliveryFailed
    );
    assert!(harness.controller.cache().is_cached());

    harness.store.reject_sends(false);
    assert_eq!(
        harness.controller.on_deliver_request(5, 5).await,
        Presentation::ArtifactSent
    );
    assert_eq!(harness.store.uploads(), 1);
}

#[tokio::test]
async fn test_failure_events_do_not_reach_presentation() {
    let mut harness = TestHarness::setup_with(Duration::from_secs(3), false);

    let presentation = harness.controller.on_deliver_request(2, 2).await;
    assert_eq!(presentation, Presentation::DeliveryFailed);

    let GateEvent::Error { message } = harness.events.recv().await.expect("error event") else {
        panic!("expected error event");
    };
    assert!(message.contains("upload failed"));
}
