//! Recording gateway for unit tests.

use super::{MessageRef, MessagingGateway};
use crate::models::{ConversationId, MessageId, PhotoRef};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(ConversationId, String),
    Delete(ConversationId, MessageId),
    Fetch(String),
}

/// Gateway that records calls and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    fail_send: bool,
    fail_delete: bool,
    fail_fetch: bool,
    hang_delete: bool,
    hang_fetch: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Self::default()
        }
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Deletes never complete.
    pub fn hanging_delete(mut self) -> Self {
        self.hang_delete = true;
        self
    }

    /// Image fetches never complete.
    pub fn hanging_fetch(mut self) -> Self {
        self.hang_fetch = true;
        self
    }

    pub fn with_image(self, file_id: &str, bytes: &[u8]) -> Self {
        self.images
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Send(..)))
            .count()
    }

    pub fn deletes(&self) -> Vec<MessageId> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Delete(_, id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_message(&self, conversation: ConversationId, text: &str) -> Result<MessageRef> {
        self.record(Call::Send(conversation, text.to_string()));
        if self.fail_send {
            return Err(Error::gateway("sendMessage", "forced failure"));
        }
        Ok(MessageRef {
            conversation_id: conversation,
            message_id: MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
        })
    }

    async fn delete_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<()> {
        self.record(Call::Delete(conversation, message));
        if self.hang_delete {
            std::future::pending::<()>().await;
        }
        if self.fail_delete {
            return Err(Error::gateway("deleteMessage", "forced failure"));
        }
        Ok(())
    }

    async fn fetch_image_bytes(&self, photo: &PhotoRef) -> Result<Vec<u8>> {
        self.record(Call::Fetch(photo.file_id.clone()));
        if self.hang_fetch {
            std::future::pending::<()>().await;
        }
        if self.fail_fetch {
            return Err(Error::gateway("getFile", "forced failure"));
        }
        Ok(self
            .images
            .lock()
            .unwrap()
            .get(&photo.file_id)
            .cloned()
            .unwrap_or_else(|| format!("image content for {}", photo.file_id).into_bytes()))
    }
}
