//! Deduplication engine.
//!
//! Three pieces, leaf first:
//! 1. **Fingerprint generator**: sender + content to a canonical key
//! 2. **Bounded store**: insertion-ordered set with oldest-first eviction
//! 3. **Duplicate response workflow**: check-and-insert, then delete the
//!    duplicate and post a notice that retracts itself
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  DuplicateResponseWorkflow                       │
//! │  ┌────────────────────┐   ┌───────────────────────────────────┐  │
//! │  │ DeduplicationStore │   │ MessagingGateway                  │  │
//! │  │                    │   │                                   │  │
//! │  │ Mutex<LruCache>    │   │ delete original ─► send notice    │  │
//! │  │ try_insert()       │   │ ─► (spawned) sleep ─► retract     │  │
//! │  └────────────────────┘   └───────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod fingerprint;
mod store;
mod workflow;

pub use config::{DEFAULT_NOTICE_TEXT, DeduplicationConfig};
pub use fingerprint::{Fingerprint, FingerprintGenerator, ImageFingerprintMode};
pub use store::DeduplicationStore;
pub use workflow::DuplicateResponseWorkflow;
