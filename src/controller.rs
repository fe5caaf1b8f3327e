//! Top-level orchestration consumed by the event dispatcher.
//!
//! The controller turns engine and cache outcomes into [`Presentation`]s.
//! It owns every requester-facing side effect of a delivery, and no internal
//! error text ever reaches a presentation.

use crate::access::{ChatId, RequesterId, VerificationEngine, VerificationOutcome};
use crate::artifact::{ArtifactCache, ArtifactSource};
use crate::event::{GateEvent, GateEventsSender};
use std::time::Duration;
use tracing::{info, warn};

/// What the requester should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Links to both groups plus a verify action.
    Welcome {
        /// Join links for the two groups, in configured order.
        join_links: [String; 2],
    },
    /// Verified; offer the download action.
    Unlocked,
    /// Not a member of both groups.
    JoinGroups,
    /// Too many attempts; wait before retrying.
    Throttled {
        /// Time left in the current cooldown window.
        retry_after: Duration,
    },
    /// Membership could not be checked.
    CheckFailed,
    /// The artifact was sent.
    ArtifactSent,
    /// The artifact could not be delivered.
    DeliveryFailed,
}

impl Presentation {
    /// Whole seconds to wait for a [`Presentation::Throttled`], rounded up, at least 1.
    #[must_use]
    pub fn wait_secs(&self) -> Option<u64> {
        match self {
            Self::Throttled { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }
}

/// Exposes the start, verify and deliver operations.
pub struct DeliveryController {
    engine: VerificationEngine,
    cache: ArtifactCache,
    source: ArtifactSource,
    join_links: [String; 2],
    events: GateEventsSender,
}

impl DeliveryController {
    /// Create a controller. The artifact source is resolved on first delivery.
    #[must_use]
    pub fn new(
        engine: VerificationEngine,
        cache: ArtifactCache,
        source: ArtifactSource,
        join_links: [String; 2],
        events: GateEventsSender,
    ) -> Self {
        Self {
            engine,
            cache,
            source,
            join_links,
            events,
        }
    }

    /// Affordance offering both join links and a verify action.
    #[must_use]
    pub fn on_start(&self, id: RequesterId) -> Presentation {
        info!("Start requested by {id}");
        Presentation::Welcome {
            join_links: self.join_links.clone(),
        }
    }

    /// Run a verification attempt for `id`.
    pub async fn on_verify_request(&self, id: RequesterId) -> Presentation {
        let outcome = self.engine.verify(id).await;
        let _ = self.events.send(GateEvent::VerificationCompleted {
            requester: id,
            outcome: outcome.label(),
        });

        match outcome {
            VerificationOutcome::Authorized => {
                info!("Requester {id} verified");
                Presentation::Unlocked
            }
            VerificationOutcome::Denied => Presentation::JoinGroups,
            VerificationOutcome::RateLimited { retry_after } => Presentation::Throttled { retry_after },
            VerificationOutcome::OracleFailure { detail } => {
                let _ = self.events.send(GateEvent::Error {
                    message: format!("verification of {id} failed: {detail}"),
                });
                Presentation::CheckFailed
            }
        }
    }

    /// Send the artifact to `destination` on behalf of `id`.
    ///
    /// Membership is not rechecked here; the deliver action is only offered
    /// after an [`Presentation::Unlocked`] result.
    pub async fn on_deliver_request(&self, id: RequesterId, destination: ChatId) -> Presentation {
        let fetched = match self.cache.fetch(&self.source).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                let _ = self.events.send(GateEvent::Error {
                    message: failure.to_string(),
                });
                return Presentation::DeliveryFailed;
            }
        };

        if fetched.uploaded {
            let _ = self.events.send(GateEvent::ArtifactUploaded {
                handle: fetched.handle.to_string(),
            });
        }

        match self.cache.store().send_by_handle(&fetched.handle, destination).await {
            Ok(()) => {
                let cached = !fetched.uploaded;
                info!(
                    "Artifact sent to {id} ({})",
                    if cached { "cached" } else { "first time, cached for reuse" }
                );
                let _ = self.events.send(GateEvent::ArtifactDelivered { requester: id, cached });
                Presentation::ArtifactSent
            }
            Err(e) => {
                warn!("Sending artifact to {id} failed: {e}");
                let _ = self.events.send(GateEvent::Error {
                    message: format!("delivery to {id} failed: {e}"),
                });
                Presentation::DeliveryFailed
            }
        }
    }

    /// The verification engine.
    #[must_use]
    pub fn engine(&self) -> &VerificationEngine {
        &self.engine
    }

    /// The artifact cache.
    #[must_use]
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }
}
