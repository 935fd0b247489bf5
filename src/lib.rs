//! # dedupbot
//!
//! A chat bot that detects near-duplicate messages per sender and removes them.
//!
//! Every inbound message is reduced to a canonical fingerprint
//! (`<sender>:<kind>:<payload>`), checked against a bounded, insertion-ordered
//! store of recently seen fingerprints, and on a repeat the original message is
//! deleted and a short-lived notice is posted to the conversation.
//!
//! ## Features
//!
//! - Case- and whitespace-insensitive text matching
//! - Image matching on the bytes of the largest photo variant
//! - Animation matching on the platform's stable file handle
//! - Bounded memory with oldest-first eviction
//! - Notice retraction scheduled outside the store lock
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dedupbot::services::{UpdateDispatcher, deduplication::DeduplicationConfig};
//!
//! let gateway = Arc::new(TelegramGateway::new(&settings)?);
//! let dispatcher = UpdateDispatcher::new(gateway, &DeduplicationConfig::default())?;
//! let outcome = dispatcher.handle(&update).await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod gateway;
pub mod models;
pub mod observability;
pub mod runner;
pub mod services;

// Re-exports for convenience
pub use config::BotConfig;
pub use gateway::{MessageRef, MessagingGateway, TelegramGateway, UpdateSource};
pub use models::{
    AnimationRef, ContentKind, ConversationId, DuplicateReport, InboundMessage, InboundUpdate,
    MessageId, Outcome, PhotoRef, SenderId,
};
pub use runner::BotRunner;
pub use services::UpdateDispatcher;
pub use services::deduplication::{
    DeduplicationConfig, DeduplicationStore, DuplicateResponseWorkflow, Fingerprint,
    FingerprintGenerator, ImageFingerprintMode,
};

/// Error type for dedupbot operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unparseable CLI values, unknown enum strings |
/// | `Configuration` | Missing bot token, zero history size, bad config file |
/// | `Gateway` | Telegram API call fails or returns `ok: false` |
/// | `Timeout` | A gateway call exceeds the configured timeout |
/// | `OperationFailed` | Local I/O, logging or metrics initialization fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is missing or invalid.
    ///
    /// Raised when:
    /// - `TELEGRAM_BOT_TOKEN` is unset or empty
    /// - The history size is zero
    /// - The TOML config file cannot be read or parsed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A chat platform call failed.
    ///
    /// Raised when:
    /// - The HTTP request cannot be sent or its body cannot be decoded
    /// - The Bot API answers with `ok: false`
    /// - A file download returns a non-success status
    #[error("gateway operation '{operation}' failed: {cause}")]
    Gateway {
        /// The gateway operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A chat platform call did not complete in time.
    #[error("gateway operation '{operation}' timed out after {after_ms}ms")]
    Timeout {
        /// The gateway operation that timed out.
        operation: String,
        /// The timeout that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// A local operation failed.
    ///
    /// Raised when:
    /// - The log file cannot be opened
    /// - The tracing subscriber or metrics recorder is already installed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Gateway`] from an operation name and any displayable cause.
    pub fn gateway(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::Gateway {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for dedupbot operations.
pub type Result<T> = std::result::Result<T, Error>;
