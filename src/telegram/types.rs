//! Bot API wire types and classification of inbound updates.

use crate::access::{ChatId, MemberStatus, RequesterId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Callback data of the verify button.
pub const VERIFY_CALLBACK: &str = "verify";

/// Callback data of the download button.
pub const DELIVER_CALLBACK: &str = "get_apk";

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    pub result: Option<T>,
    /// Error description on failure.
    pub description: Option<String>,
    /// Error code on failure.
    pub error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// Convert the envelope into the payload or an [`Error::Api`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` when `ok` is false and `Error::Protocol` when a
    /// successful response carries no result.
    pub fn into_result(self) -> Result<T> {
        if !self.ok {
            return Err(Error::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        self.result
            .ok_or_else(|| Error::Protocol("successful response without result".to_string()))
    }
}

/// An inbound update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New incoming message.
    pub message: Option<Message>,
    /// Button press.
    pub callback_query: Option<CallbackQuery>,
}

/// A user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: i64,
}

/// A chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: i64,
}

/// A message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Identifier inside the chat.
    pub message_id: i64,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Sender, absent for channel posts.
    pub from: Option<User>,
    /// Text of a text message.
    pub text: Option<String>,
    /// Attached document.
    pub document: Option<Document>,
}

/// A document attached to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// Reusable file identifier.
    pub file_id: String,
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Query identifier, used to answer the press.
    pub id: String,
    /// Who pressed.
    pub from: User,
    /// Message carrying the keyboard.
    pub message: Option<Message>,
    /// Callback data of the pressed button.
    pub data: Option<String>,
}

/// Result of `getChatMember`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    /// Membership status.
    pub status: MemberStatus,
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    /// Rows of buttons.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One inline keyboard button, either a link or a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    /// Label.
    pub text: String,
    /// URL opened on press.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Data sent back on press.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl InlineKeyboardButton {
    /// A button opening `url`.
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    /// A button sending `data` back to the bot.
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

/// Where a button press came from, used to answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackContext {
    /// Query identifier.
    pub query_id: String,
    /// Chat the keyboard lives in.
    pub chat: ChatId,
    /// Message carrying the keyboard, if known.
    pub message_id: Option<i64>,
}

/// Inbound events the gate reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start` command.
    Start {
        /// Who sent it.
        requester: RequesterId,
        /// Chat to answer in.
        chat: ChatId,
    },
    /// Verify button pressed.
    VerifyClick {
        /// Who pressed.
        requester: RequesterId,
        /// Press context.
        callback: CallbackContext,
    },
    /// Download button pressed.
    DeliverClick {
        /// Who pressed.
        requester: RequesterId,
        /// Press context.
        callback: CallbackContext,
    },
}

impl Update {
    /// Classify the update, or `None` if the gate ignores it.
    #[must_use]
    pub fn classify(&self) -> Option<InboundEvent> {
        if let Some(query) = &self.callback_query {
            let callback = CallbackContext {
                query_id: query.id.clone(),
                // Private chats share the user's id
                chat: query.message.as_ref().map_or(query.from.id, |m| m.chat.id),
                message_id: query.message.as_ref().map(|m| m.message_id),
            };
            let requester = query.from.id;
            return match query.data.as_deref() {
                Some(VERIFY_CALLBACK) => Some(InboundEvent::VerifyClick { requester, callback }),
                Some(DELIVER_CALLBACK) => Some(InboundEvent::DeliverClick { requester, callback }),
                _ => None,
            };
        }

        let message = self.message.as_ref()?;
        let command = message.text.as_deref()?.split_whitespace().next()?;
        let command = command.split('@').next()?;
        if command != "/start" {
            return None;
        }
        Some(InboundEvent::Start {
            requester: message.from.as_ref()?.id,
            chat: message.chat.id,
        })
    }
}
