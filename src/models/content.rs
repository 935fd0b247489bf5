//! Message content classification.

use super::update::{AnimationRef, PhotoRef};

/// What a message carries, decided once by [`super::InboundMessage::classify`].
///
/// Photos are still references here; the dispatcher resolves them into bytes
/// before fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageContent<'a> {
    /// A text body.
    Text(&'a str),
    /// The highest-resolution photo variant.
    Photo(&'a PhotoRef),
    /// An animation handle.
    Animation(&'a AnimationRef),
    /// Nothing the bot deduplicates.
    Unsupported,
}

impl MessageContent<'_> {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Photo(_) => "image",
            Self::Animation(_) => "animation",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Fingerprintable payload of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Raw text, normalized by the fingerprint generator.
    Text(String),
    /// Raw bytes of the largest photo variant.
    Image(Vec<u8>),
    /// Stable platform file handle of an animation.
    Animation(String),
}

impl ContentKind {
    /// Tag used in the fingerprint's middle segment.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Animation(_) => "animation",
        }
    }
}
