//! Data models for dedupbot.
//!
//! Identity newtypes, the transport-neutral inbound update, the classified
//! content union and the per-update outcome.

mod content;
mod ids;
mod outcome;
mod update;

pub use content::{ContentKind, MessageContent};
pub use ids::{ConversationId, MessageId, SenderId};
pub use outcome::{DuplicateReport, Outcome};
pub use update::{AnimationRef, InboundMessage, InboundUpdate, PhotoRef};
