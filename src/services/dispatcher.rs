//! Update dispatcher.
//!
//! Entry point for every inbound update: classifies the message, resolves the
//! content payload (downloading photo bytes when needed), fingerprints it and
//! hands it to the duplicate response workflow.

use crate::gateway::{MessagingGateway, with_timeout};
use crate::models::{ContentKind, InboundMessage, InboundUpdate, MessageContent, Outcome, PhotoRef};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

use super::deduplication::{
    DeduplicationConfig, DeduplicationStore, DuplicateResponseWorkflow, FingerprintGenerator,
};

/// Classifies updates and drives them through deduplication.
///
/// # Example
///
/// ```rust,ignore
/// use dedupbot::{DeduplicationConfig, UpdateDispatcher};
///
/// let dispatcher = UpdateDispatcher::new(gateway, &DeduplicationConfig::default())?;
/// let outcome = dispatcher.handle(&update).await?;
/// tracing::info!(outcome = outcome.as_str(), "Handled update");
/// ```
pub struct UpdateDispatcher {
    generator: FingerprintGenerator,
    workflow: DuplicateResponseWorkflow,
    gateway: Arc<dyn MessagingGateway>,
    gateway_timeout: Duration,
}

impl UpdateDispatcher {
    /// Creates a dispatcher with a fresh store sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if `config` fails validation.
    pub fn new(gateway: Arc<dyn MessagingGateway>, config: &DeduplicationConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(DeduplicationStore::with_capacity(config.max_history)?);
        Ok(Self::with_store(gateway, store, config))
    }

    /// Creates a dispatcher over an existing store.
    #[must_use]
    pub fn with_store(
        gateway: Arc<dyn MessagingGateway>,
        store: Arc<DeduplicationStore>,
        config: &DeduplicationConfig,
    ) -> Self {
        Self {
            generator: FingerprintGenerator::new(config.image_mode),
            workflow: DuplicateResponseWorkflow::new(store, Arc::clone(&gateway), config),
            gateway,
            gateway_timeout: config.gateway_timeout,
        }
    }

    /// Returns the store shared with the workflow.
    #[must_use]
    pub const fn store(&self) -> &Arc<DeduplicationStore> {
        self.workflow.store()
    }

    /// Handles one update.
    ///
    /// Updates without a message, without a sender or without supported
    /// content are [`Outcome::Ignored`] and cause no store mutation or
    /// gateway call.
    ///
    /// # Errors
    ///
    /// Returns an error only when photo bytes cannot be fetched; the store is
    /// left untouched in that case. Failures of the duplicate response itself
    /// are logged by the workflow and never surface here.
    #[instrument(skip_all, fields(operation = "handle_update", update_id = update.update_id))]
    pub async fn handle(&self, update: &InboundUpdate) -> Result<Outcome> {
        let Some(message) = update.message.as_ref() else {
            return Ok(Self::ignored("no_message"));
        };
        let Some(sender) = message.sender_id else {
            return Ok(Self::ignored("no_sender"));
        };

        let content = match message.classify() {
            MessageContent::Text(text) => ContentKind::Text(text.to_string()),
            MessageContent::Photo(photo) => ContentKind::Image(self.fetch_image(photo).await?),
            MessageContent::Animation(animation) => {
                ContentKind::Animation(animation.file_id.clone())
            },
            MessageContent::Unsupported => return Ok(Self::ignored("unsupported")),
        };

        let start = Instant::now();
        let fingerprint = self.generator.generate(sender, &content);
        metrics::histogram!("dedup_fingerprint_duration_ms", "kind" => content.tag())
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::trace!(fingerprint = %fingerprint, "Fingerprint computed");

        let outcome = self
            .workflow
            .process(fingerprint, message.conversation_id, message.message_id)
            .await;

        Self::log_outcome(message, content.tag(), &outcome);
        metrics::counter!("dedup_messages_total", "outcome" => outcome.as_str()).increment(1);
        Ok(outcome)
    }

    async fn fetch_image(&self, photo: &PhotoRef) -> Result<Vec<u8>> {
        with_timeout(
            "fetchImage",
            self.gateway_timeout,
            self.gateway.fetch_image_bytes(photo),
        )
        .await
        .inspect(|bytes| {
            tracing::debug!(file_id = %photo.file_id, bytes = bytes.len(), "Fetched photo");
        })
        .inspect_err(|e| {
            tracing::warn!(file_id = %photo.file_id, error = %e, "Failed to fetch photo");
            metrics::counter!("gateway_failures_total", "operation" => "fetch_image").increment(1);
        })
    }

    fn ignored(reason: &'static str) -> Outcome {
        tracing::debug!(reason, "Ignoring update");
        metrics::counter!("dedup_messages_total", "outcome" => "ignored").increment(1);
        Outcome::Ignored
    }

    fn log_outcome(message: &InboundMessage, kind: &'static str, outcome: &Outcome) {
        let user = message.sender_username.as_deref().unwrap_or("<unknown>");
        match outcome {
            Outcome::Accepted => tracing::info!(
                user,
                kind,
                "New message received from user {user}: {}",
                message.display_text()
            ),
            Outcome::DuplicateHandled(report) => tracing::warn!(
                user,
                kind,
                original_deleted = report.original_deleted,
                notice_sent = report.notice_id.is_some(),
                "Duplicate message from user {user} handled"
            ),
            Outcome::Ignored => {},
        }
    }
}
