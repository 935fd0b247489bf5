//! Shared fixtures for integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use dedupbot::{
    AnimationRef, ConversationId, Error, InboundMessage, InboundUpdate, MessageId, MessageRef,
    MessagingGateway, PhotoRef, Result, SenderId,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// A gateway side effect, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(ConversationId, String),
    Delete(ConversationId, MessageId),
    Fetch(String),
}

/// In-memory gateway that records calls and can be told to fail.
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    fail_send: bool,
    fail_delete: bool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::default(),
            images: Mutex::default(),
            next_id: AtomicI64::new(5000),
            fail_send: false,
            fail_delete: false,
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
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(_, id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessagingGateway for FakeGateway {
    async fn send_message(&self, conversation: ConversationId, text: &str) -> Result<MessageRef> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Send(conversation, text.to_string()));
        if self.fail_send {
            return Err(Error::gateway("sendMessage", "403 (Forbidden: bot was kicked)"));
        }
        Ok(MessageRef {
            conversation_id: conversation,
            message_id: MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
        })
    }

    async fn delete_message(&self, conversation: ConversationId, message: MessageId) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(conversation, message));
        if self.fail_delete {
            return Err(Error::gateway(
                "deleteMessage",
                "400 (Bad Request: message can't be deleted)",
            ));
        }
        Ok(())
    }

    async fn fetch_image_bytes(&self, photo: &PhotoRef) -> Result<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Fetch(photo.file_id.clone()));
        Ok(self
            .images
            .lock()
            .unwrap()
            .get(&photo.file_id)
            .cloned()
            .unwrap_or_else(|| photo.file_id.as_bytes().to_vec()))
    }
}

/// Builds updates with increasing IDs.
pub struct Updates {
    next: i64,
}

impl Updates {
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    fn message(&mut self, conversation: i64, sender: i64) -> InboundMessage {
        let id = self.next;
        self.next += 1;
        InboundMessage::new(ConversationId::new(conversation), MessageId::new(id))
            .from_sender(SenderId::new(sender))
    }

    fn wrap(message: InboundMessage) -> InboundUpdate {
        InboundUpdate::with_message(message.message_id.get(), message)
    }

    pub fn text(&mut self, conversation: i64, sender: i64, text: &str) -> InboundUpdate {
        Self::wrap(self.message(conversation, sender).with_text(text))
    }

    pub fn photo(
        &mut self,
        conversation: i64,
        sender: i64,
        sizes: &[(&str, u32, u32)],
    ) -> InboundUpdate {
        let message = sizes.iter().fold(self.message(conversation, sender), |m, (id, w, h)| {
            m.with_photo(PhotoRef::new(*id, *w, *h))
        });
        Self::wrap(message)
    }

    pub fn animation(&mut self, conversation: i64, sender: i64, file_id: &str) -> InboundUpdate {
        Self::wrap(
            self.message(conversation, sender)
                .with_animation(AnimationRef::new(file_id)),
        )
    }

    pub fn empty(&mut self, conversation: i64, sender: i64) -> InboundUpdate {
        Self::wrap(self.message(conversation, sender))
    }
}
