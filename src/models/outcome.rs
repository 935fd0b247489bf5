//! Terminal state of one dispatched update.

use super::ids::MessageId;
use tokio::task::JoinHandle;

/// Result of handling one update.
///
/// ```text
/// Received ──► Classified ──► Accepted
///    │              └───────► DuplicateHandled
///    └────────────────────► Ignored
/// ```
#[derive(Debug)]
pub enum Outcome {
    /// The fingerprint was new and is now remembered.
    Accepted,
    /// The fingerprint was already known; the duplicate response ran.
    DuplicateHandled(DuplicateReport),
    /// No message, no sender, or no supported content.
    Ignored,
}

impl Outcome {
    /// Returns true for [`Outcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Returns true for [`Outcome::DuplicateHandled`].
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateHandled(_))
    }

    /// Returns true for [`Outcome::Ignored`].
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::DuplicateHandled(_) => "duplicate",
            Self::Ignored => "ignored",
        }
    }

    /// Returns the duplicate report, if any.
    #[must_use]
    pub fn into_report(self) -> Option<DuplicateReport> {
        match self {
            Self::DuplicateHandled(report) => Some(report),
            _ => None,
        }
    }
}

/// What the duplicate response managed to do.
///
/// Gateway failures are logged by the workflow; this report only records the
/// effects that did happen.
#[derive(Debug)]
pub struct DuplicateReport {
    /// Whether the offending message was deleted.
    pub original_deleted: bool,
    /// ID of the notice posted to the conversation, if sending succeeded.
    pub notice_id: Option<MessageId>,
    /// Pending notice retraction, if a notice was posted.
    pub retraction: Option<JoinHandle<()>>,
}

impl DuplicateReport {
    /// Waits for the scheduled notice retraction to finish.
    ///
    /// Returns immediately when no retraction was scheduled.
    pub async fn retracted(self) {
        if let Some(handle) = self.retraction
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Notice retraction task failed");
        }
    }
}
