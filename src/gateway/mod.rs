//! Chat platform boundary.
//!
//! The deduplication core talks to the platform only through
//! [`MessagingGateway`]; the polling runner pulls updates through
//! [`UpdateSource`]. [`TelegramGateway`] implements both over the Telegram
//! Bot API.

mod telegram;

#[cfg(test)]
pub(crate) mod mock;

pub use telegram::{
    BotIdentity, DEFAULT_API_BASE, DEFAULT_BOT_USERNAME, DEFAULT_POLL_TIMEOUT_SECS,
    MAX_POLL_TIMEOUT_SECS, TelegramGateway, TelegramSettings,
};

use crate::models::{ConversationId, InboundUpdate, MessageId, PhotoRef};
use crate::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Reference to a message the gateway posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Conversation the message lives in.
    pub conversation_id: ConversationId,
    /// ID of the posted message.
    pub message_id: MessageId,
}

/// Outbound operations the duplicate response needs.
///
/// Every method may fail; callers in the deduplication core log failures and
/// carry on.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Posts a text message to a conversation.
    async fn send_message(&self, conversation: ConversationId, text: &str) -> Result<MessageRef>;

    /// Deletes a message from a conversation.
    async fn delete_message(&self, conversation: ConversationId, message: MessageId)
    -> Result<()>;

    /// Downloads the bytes of a photo variant.
    async fn fetch_image_bytes(&self, photo: &PhotoRef) -> Result<Vec<u8>>;
}

/// Source of inbound updates.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns the next batch of updates with `update_id >= offset`.
    ///
    /// May wait (long poll) until updates arrive or the source's own poll
    /// timeout elapses, in which case an empty batch is returned.
    async fn poll(&self, offset: i64) -> Result<Vec<InboundUpdate>>;
}

/// Runs a gateway call under a timeout.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if `timeout` elapses first, otherwise the call's
/// own result.
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or_else(|_| {
            Err(Error::Timeout {
                operation: operation.to_string(),
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        })
}
