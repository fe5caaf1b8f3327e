//! Fail-closed membership checks against the remote membership API.

use crate::access::{GroupId, RequesterId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw membership status reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Owner of the group.
    Creator,
    /// Administrator of the group.
    Administrator,
    /// Regular member.
    Member,
    /// Member with restrictions applied.
    Restricted,
    /// Not in the group, or left it.
    Left,
    /// Banned from the group.
    Kicked,
}

impl MemberStatus {
    /// Returns true for statuses that count as current membership.
    #[must_use]
    pub fn is_member_like(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// Outcome of a single group check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipResult {
    /// The requester is currently in the group.
    Member,
    /// The requester is resolvable but not in the group.
    NotMember,
    /// The check could not be resolved (error, timeout, group not found).
    Unknown,
}

/// The remote membership-query API.
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Look up the status of `id` in `group`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or when the API cannot resolve
    /// the group/requester pair.
    async fn query(&self, group: GroupId, id: RequesterId) -> Result<MemberStatus>;
}

/// Wraps a [`MembershipApi`] with a deadline and maps every failure to
/// [`MembershipResult::Unknown`].
#[derive(Clone)]
pub struct MembershipOracle {
    api: Arc<dyn MembershipApi>,
    query_timeout: Duration,
}

impl MembershipOracle {
    /// Create an oracle over `api` where each query is bounded by `query_timeout`.
    #[must_use]
    pub fn new(api: Arc<dyn MembershipApi>, query_timeout: Duration) -> Self {
        Self { api, query_timeout }
    }

    /// Check whether `id` is currently a member of `group`.
    pub async fn check_membership(&self, group: GroupId, id: RequesterId) -> MembershipResult {
        match tokio::time::timeout(self.query_timeout, self.api.query(group, id)).await {
            Ok(Ok(status)) if status.is_member_like() => MembershipResult::Member,
            Ok(Ok(status)) => {
                debug!("Requester {id} has status {status:?} in group {group}");
                MembershipResult::NotMember
            }
            Ok(Err(e)) => {
                warn!("Membership query for {id} in group {group} failed: {e}");
                MembershipResult::Unknown
            }
            Err(_) => {
                warn!(
                    "Membership query for {id} in group {group} timed out after {:?}",
                    self.query_timeout
                );
                MembershipResult::Unknown
            }
        }
    }
}
