//! Business logic services.
//!
//! The deduplication engine and the dispatcher that feeds it.

pub mod deduplication;
mod dispatcher;

pub use dispatcher::UpdateDispatcher;
