//! Duplicate response workflow.
//!
//! Decides whether a fingerprint is new and, when it is not, removes the
//! offending message and posts a notice that retracts itself after a delay:
//!
//! 1. **Check-and-insert** under the store lock
//! 2. **Delete the original** message
//! 3. **Send the notice**
//! 4. **Retract the notice** from a spawned task once the delay elapses
//!
//! Steps 2 to 4 run after the store lock is released. A failing step is
//! logged and the next step still runs.

use crate::gateway::{MessageRef, MessagingGateway, with_timeout};
use crate::models::{ConversationId, DuplicateReport, MessageId, Outcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::instrument;

use super::config::DeduplicationConfig;
use super::fingerprint::Fingerprint;
use super::store::DeduplicationStore;

/// Orchestrates the store decision and the gateway side effects.
///
/// # Example
///
/// ```rust,ignore
/// use dedupbot::{DeduplicationConfig, DeduplicationStore, DuplicateResponseWorkflow};
/// use std::sync::Arc;
///
/// let config = DeduplicationConfig::default();
/// let store = Arc::new(DeduplicationStore::with_capacity(config.max_history)?);
/// let workflow = DuplicateResponseWorkflow::new(store, gateway, &config);
///
/// match workflow.process(fingerprint, chat, message).await {
///     Outcome::Accepted => {},
///     Outcome::DuplicateHandled(report) => report.retracted().await,
///     Outcome::Ignored => unreachable!(),
/// }
/// ```
pub struct DuplicateResponseWorkflow {
    store: Arc<DeduplicationStore>,
    gateway: Arc<dyn MessagingGateway>,
    notice_text: String,
    notice_delay: Duration,
    gateway_timeout: Duration,
}

impl DuplicateResponseWorkflow {
    /// Creates a workflow over a shared store and gateway.
    #[must_use]
    pub fn new(
        store: Arc<DeduplicationStore>,
        gateway: Arc<dyn MessagingGateway>,
        config: &DeduplicationConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notice_text: config.notice_text.clone(),
            notice_delay: config.notice_delay,
            gateway_timeout: config.gateway_timeout,
        }
    }

    /// Returns the store this workflow decides against.
    #[must_use]
    pub const fn store(&self) -> &Arc<DeduplicationStore> {
        &self.store
    }

    /// Runs the workflow for one classified message.
    ///
    /// Returns [`Outcome::Accepted`] when the fingerprint was new, otherwise
    /// [`Outcome::DuplicateHandled`] once the original has been handled and
    /// the notice sent. The notice retraction is still pending at that point;
    /// its handle is in the report.
    #[instrument(
        skip_all,
        fields(
            operation = "duplicate_response",
            conversation = %conversation,
            message = %message
        )
    )]
    pub async fn process(
        &self,
        fingerprint: Fingerprint,
        conversation: ConversationId,
        message: MessageId,
    ) -> Outcome {
        if self.store.try_insert(fingerprint) {
            return Outcome::Accepted;
        }

        tracing::warn!("Duplicate message detected");
        Outcome::DuplicateHandled(self.respond(conversation, message).await)
    }

    async fn respond(&self, conversation: ConversationId, message: MessageId) -> DuplicateReport {
        let original_deleted = delete_logged(
            self.gateway.as_ref(),
            self.gateway_timeout,
            conversation,
            message,
            "original",
        )
        .await;

        let notice = self.send_notice(conversation).await;
        let retraction = notice.map(|notice| self.schedule_retraction(notice));

        DuplicateReport {
            original_deleted,
            notice_id: notice.map(|n| n.message_id),
            retraction,
        }
    }

    async fn send_notice(&self, conversation: ConversationId) -> Option<MessageRef> {
        let sent = with_timeout(
            "sendMessage",
            self.gateway_timeout,
            self.gateway.send_message(conversation, &self.notice_text),
        )
        .await;

        match sent {
            Ok(notice) => {
                tracing::debug!(notice = %notice.message_id, "Posted duplicate notice");
                Some(notice)
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to post duplicate notice");
                metrics::counter!("gateway_failures_total", "operation" => "send_notice")
                    .increment(1);
                None
            },
        }
    }

    /// Spawns the delayed notice deletion.
    ///
    /// The task owns clones of the gateway handle and never touches the store.
    fn schedule_retraction(&self, notice: MessageRef) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let delay = self.notice_delay;
        let timeout = self.gateway_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            delete_logged(
                gateway.as_ref(),
                timeout,
                notice.conversation_id,
                notice.message_id,
                "notice",
            )
            .await;
        })
    }
}

/// Deletes a message, logging instead of propagating failures.
///
/// Returns whether the deletion succeeded.
async fn delete_logged(
    gateway: &dyn MessagingGateway,
    timeout: Duration,
    conversation: ConversationId,
    message: MessageId,
    target: &'static str,
) -> bool {
    match with_timeout(
        "deleteMessage",
        timeout,
        gateway.delete_message(conversation, message),
    )
    .await
    {
        Ok(()) => {
            tracing::info!(
                conversation = %conversation,
                message = %message,
                target,
                "Deleted message"
            );
            true
        },
        Err(e) => {
            tracing::error!(
                conversation = %conversation,
                message = %message,
                target,
                error = %e,
                "Failed to delete message"
            );
            metrics::counter!("gateway_failures_total", "operation" => "delete_message")
                .increment(1);
            false
        },
    }
}
