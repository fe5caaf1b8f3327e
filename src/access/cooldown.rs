//! Per-requester cooldown for verification attempts.
//!
//! Each requester has at most one expiry instant. An attempt is granted when
//! no entry exists or the stored expiry has passed; granting overwrites the
//! entry with `now + window`. The check and the write happen under one lock
//! acquisition, so two concurrent attempts by the same requester can never
//! both be granted.

use crate::access::RequesterId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest window the gate records; longer requests are clamped.
pub const MAX_WINDOW: Duration = Duration::from_secs(86_400);

/// Decision returned by [`CooldownGate::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// The attempt may proceed; a new window has started.
    Granted,
    /// The requester is still inside its window.
    Denied {
        /// Time left until the current window expires.
        retry_after: Duration,
    },
}

impl CooldownDecision {
    /// Returns true if the attempt was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Tracks the earliest instant each requester may attempt verification again.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct CooldownGate {
    expiries: Arc<Mutex<HashMap<RequesterId, Instant>>>,
}

impl CooldownGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a new window of length `window` for `id`.
    pub fn try_acquire(&self, id: RequesterId, window: Duration) -> CooldownDecision {
        self.try_acquire_at(id, window, Instant::now())
    }

    /// Same as [`try_acquire`](Self::try_acquire) with an explicit clock reading.
    pub fn try_acquire_at(&self, id: RequesterId, window: Duration, now: Instant) -> CooldownDecision {
        let mut expiries = self.expiries.lock();

        if let Some(&expiry) = expiries.get(&id) {
            if now < expiry {
                let retry_after = expiry - now;
                debug!("Requester {id} rate limited for {retry_after:?}");
                return CooldownDecision::Denied { retry_after };
            }
        }

        let expiry = now.checked_add(window.min(MAX_WINDOW)).unwrap_or_else(|| {
            warn!("Cooldown expiry for {id} overflows the clock, window not recorded");
            now
        });
        expiries.insert(id, expiry);
        CooldownDecision::Granted
    }

    /// Drop entries whose window has already expired.
    ///
    /// Returns the number of entries removed. Stale entries never affect a
    /// decision, so sweeping only bounds memory.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Same as [`sweep_expired`](Self::sweep_expired) with an explicit clock reading.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut expiries = self.expiries.lock();
        let before = expiries.len();
        expiries.retain(|_, expiry| now < *expiry);
        before - expiries.len()
    }

    /// Number of tracked requesters, stale entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expiries.lock().len()
    }

    /// Check if no requester is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expiries.lock().is_empty()
    }
}
