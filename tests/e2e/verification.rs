//! Verification flow: cooldown, membership decisions and oracle failures.

use super::harness::{GROUP_A, GROUP_B};
use super::TestHarness;
use channel_gate::access::MemberStatus;
use channel_gate::{GateEvent, Presentation};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_start_offers_both_join_links() {
    let harness = TestHarness::setup();
    assert_eq!(
        harness.controller.on_start(1),
        Presentation::Welcome {
            join_links: ["https://t.me/a".to_string(), "https://t.me/b".to_string()],
        }
    );
}

#[tokio::test]
async fn test_member_of_both_groups_is_unlocked() {
    let mut harness = TestHarness::setup();
    harness.join_both(42);

    assert_eq!(harness.controller.on_verify_request(42).await, Presentation::Unlocked);
    assert_eq!(harness.membership.calls(), 2);
    assert_eq!(
        harness.events.recv().await.expect("event"),
        GateEvent::VerificationCompleted {
            requester: 42,
            outcome: "authorized",
        }
    );
}

#[tokio::test]
async fn test_member_of_one_group_must_join() {
    let harness = TestHarness::setup();
    harness.membership.set(GROUP_A, 3, MemberStatus::Administrator);
    harness.membership.set(GROUP_B, 3, MemberStatus::Left);

    assert_eq!(harness.controller.on_verify_request(3).await, Presentation::JoinGroups);
}

#[tokio::test]
async fn test_kicked_from_both_groups_must_join() {
    let harness = TestHarness::setup();
    harness.membership.set(GROUP_A, 4, MemberStatus::Kicked);
    harness.membership.set(GROUP_B, 4, MemberStatus::Restricted);

    assert_eq!(harness.controller.on_verify_request(4).await, Presentation::JoinGroups);
}

#[tokio::test]
async fn test_unresolvable_group_is_check_failure() {
    let mut harness = TestHarness::setup();
    // Only one group knows the requester; the other answers "chat not found"
    harness.membership.set(GROUP_A, 5, MemberStatus::Member);

    assert_eq!(harness.controller.on_verify_request(5).await, Presentation::CheckFailed);

    let _completed = harness.events.recv().await.expect("completed event");
    let GateEvent::Error { message } = harness.events.recv().await.expect("error event") else {
        panic!("expected error event");
    };
    assert!(message.contains(&GROUP_B.to_string()));
}

#[tokio::test]
async fn test_slow_oracle_is_check_failure() {
    let harness = TestHarness::setup();
    harness.join_both(6);
    harness.membership.set_delay(Duration::from_secs(2));

    let started = std::time::Instant::now();
    assert_eq!(harness.controller.on_verify_request(6).await, Presentation::CheckFailed);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_second_attempt_within_window_is_throttled() {
    let harness = TestHarness::setup();
    harness.join_both(7);

    assert_eq!(harness.controller.on_verify_request(7).await, Presentation::Unlocked);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let second = harness.controller.on_verify_request(7).await;
    let Presentation::Throttled { retry_after } = second else {
        panic!("expected throttle, got {second:?}");
    };
    assert!(retry_after > Duration::from_millis(1500), "{retry_after:?}");
    assert!(retry_after <= Duration::from_secs(2), "{retry_after:?}");
    assert_eq!(second.wait_secs(), Some(2));

    // Only the first attempt reached the oracle
    assert_eq!(harness.membership.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_reach_oracle_once() {
    let harness = TestHarness::setup();
    harness.join_both(8);
    harness.membership.set_delay(Duration::from_millis(20));

    let tasks: Vec<_> = (0..24)
        .map(|_| {
            let controller = Arc::clone(&harness.controller);
            tokio::spawn(async move { controller.on_verify_request(8).await })
        })
        .collect();

    let results: Vec<Presentation> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("join"))
        .collect();

    let unlocked = results.iter().filter(|p| **p == Presentation::Unlocked).count();
    let throttled = results
        .iter()
        .filter(|p| matches!(p, Presentation::Throttled { .. }))
        .count();
    assert_eq!(unlocked, 1);
    assert_eq!(throttled, 23);
    assert_eq!(harness.membership.calls(), 2);
}

#[tokio::test]
async fn test_attempt_after_window_is_granted() {
    let harness = TestHarness::setup_with(Duration::from_millis(100), true);
    harness.membership.set(GROUP_A, 9, MemberStatus::Member);

    // Denied attempts inside the window do not extend it
    assert_eq!(harness.controller.on_verify_request(9).await, Presentation::CheckFailed);
    for _ in 0..3 {
        assert!(matches!(
            harness.controller.on_verify_request(9).await,
            Presentation::Throttled { .. }
        ));
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    harness.membership.set(GROUP_B, 9, MemberStatus::Creator);

    assert_eq!(harness.controller.on_verify_request(9).await, Presentation::Unlocked);
    assert_eq!(harness.membership.calls(), 4);
}

#[tokio::test]
async fn test_requesters_do_not_share_cooldown() {
    let harness = TestHarness::setup();
    harness.join_both(10);
    harness.join_both(11);

    assert_eq!(harness.controller.on_verify_request(10).await, Presentation::Unlocked);
    assert_eq!(harness.controller.on_verify_request(11).await, Presentation::Unlocked);
}
