//! Long-polling bot runner.
//!
//! Pulls batches of updates from an [`UpdateSource`] and hands each update to
//! the [`UpdateDispatcher`] on its own task, so a slow photo download or a
//! pending duplicate response never holds up the next update.
//!
//! # Lifecycle
//!
//! 1. Poll with the current offset
//! 2. Advance the offset past the highest `update_id` seen
//! 3. Spawn one task per update; errors and panics are logged per update
//! 4. On a failed poll, back off and retry
//! 5. On shutdown, stop polling and drain the in-flight tasks

use crate::gateway::UpdateSource;
use crate::models::InboundUpdate;
use crate::services::UpdateDispatcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};

/// Delay before retrying after a failed poll.
pub const POLL_BACKOFF: Duration = Duration::from_secs(5);

/// Drives the poll, dispatch and shutdown loop.
pub struct BotRunner {
    source: Arc<dyn UpdateSource>,
    dispatcher: Arc<UpdateDispatcher>,
    backoff: Duration,
}

impl BotRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(source: Arc<dyn UpdateSource>, dispatcher: Arc<UpdateDispatcher>) -> Self {
        Self {
            source,
            dispatcher,
            backoff: POLL_BACKOFF,
        }
    }

    /// Overrides the retry delay after a failed poll.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs until `shutdown` resolves.
    ///
    /// Returns the number of updates dispatched. In-flight update tasks are
    /// awaited before returning; scheduled notice retractions are not.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut offset = 0_i64;
        let mut dispatched = 0_u64;
        let mut tasks = JoinSet::new();

        tracing::info!("Polling for updates");

        loop {
            while let Some(joined) = tasks.try_join_next() {
                Self::reap(joined);
            }

            let batch = tokio::select! {
                () = &mut shutdown => break,
                batch = self.source.poll(offset) => batch,
            };

            match batch {
                Ok(updates) => {
                    if !updates.is_empty() {
                        tracing::debug!(count = updates.len(), offset, "Received updates");
                    }
                    for update in updates {
                        offset = offset.max(update.update_id.saturating_add(1));
                        dispatched += 1;
                        let dispatcher = Arc::clone(&self.dispatcher);
                        tasks.spawn(async move { Self::dispatch(&dispatcher, update).await });
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        backoff_ms = u64::try_from(self.backoff.as_millis()).unwrap_or(u64::MAX),
                        "Polling failed, retrying"
                    );
                    metrics::counter!("gateway_failures_total", "operation" => "poll").increment(1);

                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(self.backoff) => {},
                    }
                },
            }
        }

        tracing::info!(in_flight = tasks.len(), dispatched, "Shutting down");
        while let Some(joined) = tasks.join_next().await {
            Self::reap(joined);
        }
        dispatched
    }

    async fn dispatch(dispatcher: &UpdateDispatcher, update: InboundUpdate) {
        match dispatcher.handle(&update).await {
            Ok(outcome) => tracing::debug!(
                update_id = update.update_id,
                outcome = outcome.as_str(),
                "Update handled"
            ),
            Err(e) => tracing::error!(
                update_id = update.update_id,
                error = %e,
                "Failed to handle update"
            ),
        }
    }

    fn reap(joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!(error = %e, "Update handler panicked");
            } else {
                tracing::warn!(error = %e, "Update handler cancelled");
            }
        }
    }
}
