//! Telegram Bot API transport.
//!
//! - [`TelegramClient`] talks to the Bot API and implements the membership
//!   API and artifact store used by the gate.
//! - [`types`] holds the wire types and turns updates into [`InboundEvent`]s.
//! - [`render`] turns controller presentations into replies.

mod client;
pub mod render;
pub mod types;

pub use client::TelegramClient;
pub use render::{render, Reply};
pub use types::{CallbackContext, InboundEvent, Update};
