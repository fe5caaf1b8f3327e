//! In-memory test harness around the delivery controller.
//!
//! The `TestHarness` replaces the Bot API with recording collaborators so
//! scenarios can drive the controller exactly as the bot does and then
//! inspect which external calls were made.

use async_trait::async_trait;
use channel_gate::access::{
    ChatId, GroupId, MemberStatus, MembershipApi, MembershipOracle, RequesterId, VerificationConfig,
    VerificationEngine,
};
use channel_gate::artifact::{ArtifactCache, ArtifactHandle, ArtifactSource, ArtifactStore};
use channel_gate::event::{create_event_channel, GateEventsChannel};
use channel_gate::{DeliveryController, Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// First required group.
pub const GROUP_A: GroupId = -100_111;

/// Second required group.
pub const GROUP_B: GroupId = -100_222;

/// Membership API answering from a mutable table.
///
/// Pairs missing from the table answer "chat not found".
#[derive(Default)]
pub struct MockMembershipApi {
    statuses: Mutex<HashMap<(GroupId, RequesterId), MemberStatus>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl MockMembershipApi {
    /// Set the status of `id` in `group`.
    pub fn set(&self, group: GroupId, id: RequesterId, status: MemberStatus) {
        self.statuses.lock().insert((group, id), status);
    }

    /// Delay every answer by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of queries made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipApi for MockMembershipApi {
    async fn query(&self, group: GroupId, id: RequesterId) -> Result<MemberStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let status = self.statuses.lock().get(&(group, id)).copied();
        status.ok_or_else(|| Error::Api {
            code: 400,
            description: "Bad Request: chat not found".to_string(),
        })
    }
}

/// Artifact store that reads the real source file and records every call.
#[derive(Default)]
pub struct MockArtifactStore {
    uploads: AtomicUsize,
    upload_delay: Mutex<Duration>,
    reject_sends: Mutex<bool>,
    sent: Mutex<Vec<(ArtifactHandle, ChatId)>>,
}

impl MockArtifactStore {
    /// Delay every upload by `delay`.
    pub fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.lock() = delay;
    }

    /// Make every send fail.
    pub fn reject_sends(&self, reject: bool) {
        *self.reject_sends.lock() = reject;
    }

    /// Number of uploads attempted.
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Every successful send, in order.
    pub fn sent(&self) -> Vec<(ArtifactHandle, ChatId)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ArtifactStore for MockArtifactStore {
    async fn upload(&self, source: &ArtifactSource) -> Result<ArtifactHandle> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.upload_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let bytes = tokio::fs::read(source.path()).await?;
        Ok(ArtifactHandle::new(format!("file-{n}-{}", bytes.len())))
    }

    async fn send_by_handle(&self, handle: &ArtifactHandle, destination: ChatId) -> Result<()> {
        if *self.reject_sends.lock() {
            return Err(Error::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().push((handle.clone(), destination));
        Ok(())
    }
}

/// Controller wired to mock collaborators.
pub struct TestHarness {
    /// The controller under test.
    pub controller: Arc<DeliveryController>,
    /// Membership API mock.
    pub membership: Arc<MockMembershipApi>,
    /// Artifact store mock.
    pub store: Arc<MockArtifactStore>,
    /// Gate events.
    pub events: GateEventsChannel,
    /// Artifact path served by the controller.
    pub artifact_path: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Harness with an existing artifact and a 3 second cooldown.
    pub fn setup() -> Self {
        Self::setup_with(Duration::from_secs(3), true)
    }

    /// Harness with a custom cooldown, optionally without the artifact file.
    pub fn setup_with(cooldown: Duration, create_artifact: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifact_path = dir.path().join("PhonePe_1.0.apk");
        if create_artifact {
            std::fs::write(&artifact_path, b"apk-bytes").expect("write artifact");
        }

        let membership = Arc::new(MockMembershipApi::default());
        let store = Arc::new(MockArtifactStore::default());
        let (events_tx, events) = create_event_channel();

        let engine = VerificationEngine::new(
            MembershipOracle::new(membership.clone(), Duration::from_millis(200)),
            VerificationConfig {
                groups: [GROUP_A, GROUP_B],
                cooldown,
            },
        );
        let cache = ArtifactCache::with_timeout(store.clone(), Duration::from_secs(5));
        let controller = DeliveryController::new(
            engine,
            cache,
            ArtifactSource::new(artifact_path.clone()),
            ["https://t.me/a".to_string(), "https://t.me/b".to_string()],
            events_tx,
        );

        Self {
            controller: Arc::new(controller),
            membership,
            store,
            events,
            artifact_path,
            _dir: dir,
        }
    }

    /// Make `id` a plain member of both groups.
    pub fn join_both(&self, id: RequesterId) {
        self.membership.set(GROUP_A, id, MemberStatus::Member);
        self.membership.set(GROUP_B, id, MemberStatus::Member);
    }
}
