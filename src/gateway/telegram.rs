//! Telegram Bot API gateway.
//!
//! Implements [`MessagingGateway`] and [`UpdateSource`] over the HTTP Bot API
//! using an async `reqwest` client. Wire objects are decoded into private DTOs
//! and mapped onto the transport-neutral models at this boundary.

use super::{MessageRef, MessagingGateway, UpdateSource};
use crate::models::{
    AnimationRef, ConversationId, InboundMessage, InboundUpdate, MessageId, PhotoRef, SenderId,
};
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default bot username.
pub const DEFAULT_BOT_USERNAME: &str = "DeduplicationCheckerBot";

/// Default long-poll timeout for `getUpdates`, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Longest long-poll timeout the Bot API honours, in seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Extra time the HTTP client waits beyond the long-poll timeout.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Connection settings for the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    /// Bot token issued by `BotFather`.
    pub token: SecretString,
    /// Bot username, used for logging and the startup identity check.
    pub username: String,
    /// API base URL, without a trailing slash.
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl TelegramSettings {
    /// Creates settings for a token with default endpoint and username.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            ..Self::default()
        }
    }

    /// Checks that the long-poll timeout is within the Bot API limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the timeout exceeds
    /// [`MAX_POLL_TIMEOUT_SECS`].
    pub fn validate_poll_timeout(&self) -> Result<()> {
        if self.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(Error::Configuration(format!(
                "poll timeout must be at most {MAX_POLL_TIMEOUT_SECS}s, got {}",
                self.poll_timeout_secs
            )));
        }
        Ok(())
    }

    /// Returns true if a non-blank token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: SecretString::from(String::new()),
            username: DEFAULT_BOT_USERNAME.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        }
    }
}

/// Telegram Bot API client.
pub struct TelegramGateway {
    client: reqwest::Client,
    token: SecretString,
    api_base: String,
    poll_timeout_secs: u64,
}

impl TelegramGateway {
    /// Creates a gateway from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the token is blank or the poll
    /// timeout is out of range, or [`Error::OperationFailed`] if the HTTP
    /// client cannot be built.
    pub fn new(settings: &TelegramSettings) -> Result<Self> {
        if !settings.has_token() {
            return Err(Error::Configuration(
                "TELEGRAM_BOT_TOKEN is not set".to_string(),
            ));
        }

        settings.validate_poll_timeout()?;
        let request_timeout = Duration::from_secs(settings.poll_timeout_secs)
            .checked_add(HTTP_TIMEOUT_MARGIN)
            .ok_or_else(|| Error::Configuration("poll timeout is too large".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::OperationFailed {
                operation: "build_http_client".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            client,
            token: settings.token.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            poll_timeout_secs: settings.poll_timeout_secs,
        })
    }

    /// Fetches the bot's own identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gateway`] if the call fails or the token is rejected.
    pub async fn get_me(&self) -> Result<BotIdentity> {
        let me: TgUser = self.call("getMe", &json!({})).await?;
        Ok(BotIdentity {
            id: me.id,
            username: me.username,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret())
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{file_path}",
            self.api_base,
            self.token.expose_secret()
        )
    }

    /// Strips the token from any text that may echo a request URL.
    fn sanitize(&self, text: &str) -> String {
        let token = self.token.expose_secret();
        if token.is_empty() {
            text.to_string()
        } else {
            text.replace(token, "[REDACTED]")
        }
    }

    fn transport_error(&self, operation: &str, err: reqwest::Error) -> Error {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_decode() {
            "decode"
        } else {
            "request"
        };
        let cause = self.sanitize(&err.without_url().to_string());
        tracing::debug!(operation, error_kind = kind, error = %cause, "Bot API transport error");
        Error::gateway(operation, format!("{kind}: {cause}"))
    }

    /// Posts a Bot API method and unwraps the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: &serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        // Error responses carry the same envelope, so decode regardless of status.
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        envelope
            .into_result(method)
            .map_err(|e| match e {
                Error::Gateway { operation, cause } => Error::Gateway {
                    operation,
                    cause: self.sanitize(&cause),
                },
                other => other,
            })
    }

    async fn download(&self, file_path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| self.transport_error("downloadFile", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::gateway(
                "downloadFile",
                format!("download failed with status {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error("downloadFile", e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    #[instrument(skip(self, text), fields(operation = "send_message"))]
    async fn send_message(&self, conversation: ConversationId, text: &str) -> Result<MessageRef> {
        let sent: TgMessage = self
            .call(
                "sendMessage",
                &json!({ "chat_id": conversation.get(), "text": text }),
            )
            .await?;

        Ok(MessageRef {
            conversation_id: ConversationId::new(sent.chat.id),
            message_id: MessageId::new(sent.message_id),
        })
    }

    #[instrument(skip(self), fields(operation = "delete_message"))]
    async fn delete_message(&self, conversation: ConversationId, message: MessageId) -> Result<()> {
        let deleted: bool = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": conversation.get(), "message_id": message.get() }),
            )
            .await?;

        if deleted {
            Ok(())
        } else {
            Err(Error::gateway("deleteMessage", "message was not deleted"))
        }
    }

    #[instrument(skip(self, photo), fields(operation = "fetch_image", file_id = %photo.file_id))]
    async fn fetch_image_bytes(&self, photo: &PhotoRef) -> Result<Vec<u8>> {
        let file: TgFile = self
            .call("getFile", &json!({ "file_id": photo.file_id }))
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| Error::gateway("getFile", "response has no file_path"))?;

        self.download(&file_path).await
    }
}

#[async_trait]
impl UpdateSource for TelegramGateway {
    async fn poll(&self, offset: i64) -> Result<Vec<InboundUpdate>> {
        let updates: Vec<TgUpdate> = self
            .call(
                "getUpdates",
                &json!({
                    "offset": offset,
                    "timeout": self.poll_timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        Ok(updates.into_iter().map(InboundUpdate::from).collect())
    }
}

/// Identity reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// Bot user ID.
    pub id: i64,
    /// Bot username, without the leading `@`.
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, operation: &str) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(Error::gateway(operation, "response has no result")),
            (false, _) => {
                let description = self
                    .description
                    .unwrap_or_else(|| "unknown Bot API error".to_string());
                Err(Error::gateway(
                    operation,
                    format!("{} ({description})", self.error_code.unwrap_or_default()),
                ))
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
    caption: Option<String>,
    #[serde(default)]
    photo: Vec<TgPhotoSize>,
    animation: Option<TgFileRef>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgPhotoSize {
    file_id: String,
    width: u32,
    height: u32,
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TgFileRef {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    file_path: Option<String>,
}

impl From<TgUpdate> for InboundUpdate {
    fn from(update: TgUpdate) -> Self {
        Self {
            update_id: update.update_id,
            message: update.message.map(InboundMessage::from),
        }
    }
}

impl From<TgMessage> for InboundMessage {
    fn from(message: TgMessage) -> Self {
        let (sender_id, sender_username) = message
            .from
            .map_or((None, None), |user| (Some(SenderId::new(user.id)), user.username));

        Self {
            message_id: MessageId::new(message.message_id),
            conversation_id: ConversationId::new(message.chat.id),
            sender_id,
            sender_username,
            text: message.text,
            caption: message.caption,
            photo: message
                .photo
                .into_iter()
                .map(|p| PhotoRef {
                    file_id: p.file_id,
                    width: p.width,
                    height: p.height,
                    file_size: p.file_size,
                })
                .collect(),
            animation: message.animation.map(|a| AnimationRef::new(a.file_id)),
        }
    }
}
