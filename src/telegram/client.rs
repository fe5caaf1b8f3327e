//! Bot API client over HTTPS.
//!
//! Serves as the membership API and the artifact store of the gate, and as
//! the transport used by the polling loop.

use crate::access::{ChatId, GroupId, MemberStatus, MembershipApi, RequesterId};
use crate::artifact::{ArtifactHandle, ArtifactSource, ArtifactStore};
use crate::config::GateConfig;
use crate::error::{Error, Result};
use crate::telegram::types::{ApiResponse, ChatMember, InlineKeyboardMarkup, Message, Update};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Slack added on top of the long-polling timeout for the HTTP deadline.
const POLL_SLACK: Duration = Duration::from_secs(10);

/// Delivery options applied to every document sent.
#[derive(Debug, Clone)]
struct DocumentOptions {
    storage_chat_id: ChatId,
    caption: String,
    protect_content: bool,
}

/// Bot API client.
pub struct TelegramClient {
    http: reqwest::Client,
    endpoint: String,
    poll_timeout: Duration,
    document: DocumentOptions,
}

impl TelegramClient {
    /// Create a client from the gate configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GateConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.artifact.upload_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}",
                config.telegram.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            poll_timeout: Duration::from_secs(config.telegram.poll_timeout_secs),
            document: DocumentOptions {
                storage_chat_id: config.artifact.storage_chat_id,
                caption: config.artifact.caption.clone(),
                protect_content: config.artifact.protect_content,
            },
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.endpoint)
    }

    /// Decode a response body. URLs are stripped from transport errors since
    /// they embed the bot token.
    async fn decode<T: DeserializeOwned>(response: reqwest::Result<reqwest::Response>) -> Result<T> {
        let body = response
            .map_err(reqwest::Error::without_url)?
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        envelope.into_result()
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("Bot API call {method}");
        Self::decode(self.http.post(self.url(method)).json(params).send().await).await
    }

    /// Long-poll for updates starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or API failure.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let params = json!({
            "offset": offset,
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let response = self
            .http
            .post(self.url("getUpdates"))
            .timeout(self.poll_timeout + POLL_SLACK)
            .json(&params)
            .send()
            .await;
        Self::decode(response).await
    }

    /// Look up the membership of `user_id` in `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or if the chat or user is unknown.
    pub async fn get_chat_member(&self, chat_id: ChatId, user_id: RequesterId) -> Result<ChatMember> {
        self.call("getChatMember", &json!({ "chat_id": chat_id, "user_id": user_id }))
            .await
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or API failure.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        self.call("sendMessage", &params).await
    }

    /// Replace text and keyboard of an existing message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or API failure.
    pub async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        // The result is the edited message or `true`; neither is needed
        let _: serde_json::Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    /// Answer a button press, optionally with a notification or alert.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or API failure, including answering the
    /// same press twice.
    pub async fn answer_callback_query(&self, query_id: &str, text: Option<&str>, show_alert: bool) -> Result<()> {
        let mut params = json!({ "callback_query_id": query_id, "show_alert": show_alert });
        if let Some(text) = text {
            params["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", &params).await?;
        Ok(())
    }

    /// Upload the file behind `source` as a document into `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the upload is rejected.
    pub async fn send_document_file(&self, chat_id: ChatId, source: &ArtifactSource) -> Result<Message> {
        let bytes = tokio::fs::read(source.path()).await?;
        debug!("Uploading {} ({} bytes)", source.path().display(), bytes.len());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", self.document.caption.clone())
            .text("protect_content", self.document.protect_content.to_string())
            .part("document", Part::bytes(bytes).file_name(source.file_name()));

        let response = self.http.post(self.url("sendDocument")).multipart(form).send().await;
        Self::decode(response).await
    }

    /// Send an already uploaded document by its file identifier.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or API failure.
    pub async fn send_document_id(&self, chat_id: ChatId, file_id: &str) -> Result<Message> {
        self.call(
            "sendDocument",
            &json!({
                "chat_id": chat_id,
                "document": file_id,
                "caption": self.document.caption,
                "protect_content": self.document.protect_content,
            }),
        )
        .await
    }
}

#[async_trait]
impl MembershipApi for TelegramClient {
    async fn query(&self, group: GroupId, id: RequesterId) -> Result<MemberStatus> {
        Ok(self.get_chat_member(group, id).await?.status)
    }
}

#[async_trait]
impl ArtifactStore for TelegramClient {
    async fn upload(&self, source: &ArtifactSource) -> Result<ArtifactHandle> {
        let message = self
            .send_document_file(self.document.storage_chat_id, source)
            .await?;
        message
            .document
            .map(|document| ArtifactHandle::new(document.file_id))
            .ok_or_else(|| Error::Protocol("upload response carried no document".to_string()))
    }

    async fn send_by_handle(&self, handle: &ArtifactHandle, destination: ChatId) -> Result<()> {
        self.send_document_id(destination, handle.as_str()).await?;
        Ok(())
    }
}
