//! Access gate for channel-gate.
//!
//! A requester is authorized when it is a member of both configured groups.
//! Attempts are rate limited per requester before the remote API is queried.
//!
//! # Architecture
//!
//! ```text
//! Verify click received
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Cooldown gate       │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!  DENIED       GRANTED
//!    │             │
//!    ▼             ▼
//! RateLimited  Query both groups (concurrently)
//!                  │
//!        ┌─────────┼──────────┐
//!        │         │          │
//!   both Member  any Unknown  otherwise
//!        │         │          │
//!        ▼         ▼          ▼
//!   Authorized  OracleFailure Denied
//! ```

mod cooldown;
mod engine;
mod oracle;

pub use cooldown::{CooldownDecision, CooldownGate, MAX_WINDOW};
pub use engine::{decide, VerificationConfig, VerificationEngine, VerificationOutcome, DEFAULT_COOLDOWN};
pub use oracle::{MemberStatus, MembershipApi, MembershipOracle, MembershipResult};

/// Numeric identifier of the requesting user, as supplied by the transport.
pub type RequesterId = i64;

/// Numeric identifier of a group (channel) the requester must belong to.
pub type GroupId = i64;

/// Numeric identifier of a chat messages are delivered to.
pub type ChatId = i64;
