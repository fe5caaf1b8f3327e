//! # channel-gate
//!
//! A Telegram bot that hands out a single artifact to users who are members
//! of two configured channels.
//!
//! The interesting parts are small and concurrency-sensitive:
//!
//! - [`access::CooldownGate`] allows at most one verification attempt per
//!   requester per cooldown window, however many arrive at once.
//! - [`access::VerificationEngine`] checks both memberships through a
//!   fail-closed [`access::MembershipOracle`].
//! - [`artifact::ArtifactCache`] uploads the artifact at most once per
//!   process and reuses the returned handle for every delivery.
//! - [`DeliveryController`] maps those outcomes to what the requester sees.
//!
//! [`BotBuilder`] wires them to the Telegram Bot API via long polling.

pub mod access;
pub mod artifact;
pub mod bot;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod telegram;

pub use bot::{BotBuilder, RunningBot};
pub use config::GateConfig;
pub use controller::{DeliveryController, Presentation};
pub use error::{Error, Result};
pub use event::{GateEvent, GateEventsChannel, GateEventsSender};
