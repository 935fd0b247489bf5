//! Transport-neutral inbound update.
//!
//! The gateway maps the platform's wire objects into these types; everything
//! downstream of the gateway only sees this shape.

use super::content::MessageContent;
use super::ids::{ConversationId, MessageId, SenderId};
use serde::{Deserialize, Serialize};

/// One update delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundUpdate {
    /// Monotonic update identifier used as the polling offset.
    pub update_id: i64,
    /// The message carried by this update, if any.
    pub message: Option<InboundMessage>,
}

impl InboundUpdate {
    /// Creates an update carrying a message.
    #[must_use]
    pub const fn with_message(update_id: i64, message: InboundMessage) -> Self {
        Self {
            update_id,
            message: Some(message),
        }
    }

    /// Returns true if the update carries a message.
    #[must_use]
    pub const fn has_message(&self) -> bool {
        self.message.is_some()
    }
}

/// A chat message as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message identifier within its conversation.
    pub message_id: MessageId,
    /// Conversation the message was posted in.
    pub conversation_id: ConversationId,
    /// Author of the message. Channel posts have no author.
    pub sender_id: Option<SenderId>,
    /// Author's username, for logging only.
    pub sender_username: Option<String>,
    /// Text body.
    pub text: Option<String>,
    /// Media caption, for logging only.
    pub caption: Option<String>,
    /// Available sizes of an attached photo.
    pub photo: Vec<PhotoRef>,
    /// Attached animation.
    pub animation: Option<AnimationRef>,
}

impl InboundMessage {
    /// Creates an empty message addressed by conversation and message ID.
    #[must_use]
    pub fn new(conversation_id: ConversationId, message_id: MessageId) -> Self {
        Self {
            message_id,
            conversation_id,
            ..Self::default()
        }
    }

    /// Sets the author.
    #[must_use]
    pub const fn from_sender(mut self, sender_id: SenderId) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    /// Sets the text body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Adds a photo size.
    #[must_use]
    pub fn with_photo(mut self, photo: PhotoRef) -> Self {
        self.photo.push(photo);
        self
    }

    /// Sets the animation.
    #[must_use]
    pub fn with_animation(mut self, animation: AnimationRef) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Classifies the message content.
    ///
    /// Text takes priority over a photo, a photo over an animation. Anything
    /// else is [`MessageContent::Unsupported`].
    #[must_use]
    pub fn classify(&self) -> MessageContent<'_> {
        if let Some(text) = self.text.as_deref() {
            return MessageContent::Text(text);
        }
        if let Some(photo) = self.largest_photo() {
            return MessageContent::Photo(photo);
        }
        if let Some(animation) = self.animation.as_ref() {
            return MessageContent::Animation(animation);
        }
        MessageContent::Unsupported
    }

    /// Returns the highest-resolution photo variant.
    ///
    /// Ties on pixel area resolve to the later entry.
    #[must_use]
    pub fn largest_photo(&self) -> Option<&PhotoRef> {
        self.photo.iter().max_by_key(|p| p.area())
    }

    /// Returns the text or caption for log lines.
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or("<empty>")
    }
}

/// One size variant of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    /// File identifier used to fetch the bytes.
    pub file_id: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// File size in bytes, when known.
    pub file_size: Option<u64>,
}

impl PhotoRef {
    /// Creates a photo reference.
    #[must_use]
    pub fn new(file_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            file_id: file_id.into(),
            width,
            height,
            file_size: None,
        }
    }

    /// Pixel area of this variant.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An attached animation (GIF or silent video).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationRef {
    /// Stable platform file handle.
    pub file_id: String,
}

impl AnimationRef {
    /// Creates an animation reference.
    #[must_use]
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}
