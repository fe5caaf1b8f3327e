//! Rendering of presentations into Bot API replies.

use crate::controller::Presentation;
use crate::telegram::types::{InlineKeyboardButton, InlineKeyboardMarkup, DELIVER_CALLBACK, VERIFY_CALLBACK};

/// How a presentation is shown to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send a new message.
    Message {
        /// Message text.
        text: String,
        /// Attached keyboard.
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// Replace the message that carried the pressed button.
    Edit {
        /// New text.
        text: String,
        /// New keyboard.
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// Pop-up answer to the button press.
    Alert {
        /// Alert text.
        text: String,
    },
    /// Nothing further to show.
    Silent,
}

/// Text of the acknowledgement sent before a delivery starts.
pub const PREPARING_TEXT: &str = "📦 Preparing APK...";

/// Render `presentation` for the Bot API.
#[must_use]
pub fn render(presentation: &Presentation) -> Reply {
    match presentation {
        Presentation::Welcome { join_links: [first, second] } => Reply::Message {
            text: "🚀 Please join both channels to continue:".to_string(),
            keyboard: Some(InlineKeyboardMarkup {
                inline_keyboard: vec![
                    vec![
                        InlineKeyboardButton::link("Join Channel 1", first.clone()),
                        InlineKeyboardButton::link("Join Channel 2", second.clone()),
                    ],
                    vec![InlineKeyboardButton::callback("Verify", VERIFY_CALLBACK)],
                ],
            }),
        },
        Presentation::Unlocked => Reply::Edit {
            text: "✅ Verified! You can now download the APK:".to_string(),
            keyboard: Some(InlineKeyboardMarkup {
                inline_keyboard: vec![vec![InlineKeyboardButton::callback("Get APK 🎁", DELIVER_CALLBACK)]],
            }),
        },
        Presentation::JoinGroups => Reply::Alert {
            text: "❌ Please join both channels first!".to_string(),
        },
        Presentation::Throttled { .. } => Reply::Alert {
            text: format!(
                "⏳ Slow down! Try again in {} seconds.",
                presentation.wait_secs().unwrap_or(1)
            ),
        },
        Presentation::CheckFailed => Reply::Alert {
            text: "❌ Could not check your membership right now. Please try again later.".to_string(),
        },
        Presentation::ArtifactSent => Reply::Silent,
        Presentation::DeliveryFailed => Reply::Alert {
            text: "❌ Error sending APK! Please try again later.".to_string(),
        },
    }
}
