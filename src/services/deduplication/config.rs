//! Deduplication configuration.
//!
//! Plain values handed to the store, the fingerprint generator and the
//! duplicate response workflow at construction time.

use std::time::Duration;

use super::fingerprint::ImageFingerprintMode;

/// Default notice posted when a duplicate is removed.
pub const DEFAULT_NOTICE_TEXT: &str = "Duplicate message detected and removed!";

/// Configuration for deduplication and the duplicate response.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `DEDUPBOT_MAX_HISTORY` | usize | `10000` | Remembered fingerprints |
/// | `DEDUPBOT_NOTICE_DELAY_MS` | u64 | `2000` | Delay before the notice is retracted |
/// | `DEDUPBOT_NOTICE_TEXT` | string | see [`DEFAULT_NOTICE_TEXT`] | Notice body |
/// | `DEDUPBOT_IMAGE_FINGERPRINT` | `base64`/`sha256` | `base64` | Image payload encoding |
/// | `DEDUPBOT_GATEWAY_TIMEOUT_MS` | u64 | `10000` | Timeout per gateway call |
///
/// # Example
///
/// ```rust
/// use dedupbot::DeduplicationConfig;
/// use std::time::Duration;
///
/// let config = DeduplicationConfig::default();
/// assert_eq!(config.max_history, 10_000);
/// assert_eq!(config.notice_delay, Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationConfig {
    /// Maximum number of remembered fingerprints.
    pub max_history: usize,

    /// How long the duplicate notice stays visible.
    pub notice_delay: Duration,

    /// Body of the duplicate notice.
    pub notice_text: String,

    /// How image bytes enter the fingerprint.
    pub image_mode: ImageFingerprintMode,

    /// Upper bound on each gateway call (send, delete, fetch).
    pub gateway_timeout: Duration,
}

impl DeduplicationConfig {
    /// Applies `DEDUPBOT_*` overrides read through `lookup` on top of the
    /// current values.
    ///
    /// Unset, blank or unparseable values leave the current value in place.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "DEDUPBOT_MAX_HISTORY") {
            self.max_history = v;
        }
        if let Some(ms) = parse_var(&lookup, "DEDUPBOT_NOTICE_DELAY_MS") {
            self.notice_delay = Duration::from_millis(ms);
        }
        if let Some(text) = lookup("DEDUPBOT_NOTICE_TEXT")
            && !text.trim().is_empty()
        {
            self.notice_text = text;
        }
        if let Some(mode) = parse_var(&lookup, "DEDUPBOT_IMAGE_FINGERPRINT") {
            self.image_mode = mode;
        }
        if let Some(ms) = parse_var(&lookup, "DEDUPBOT_GATEWAY_TIMEOUT_MS") {
            self.gateway_timeout = Duration::from_millis(ms);
        }
    }

    /// Sets the history size.
    #[must_use]
    pub const fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Sets the notice retraction delay.
    #[must_use]
    pub const fn with_notice_delay(mut self, delay: Duration) -> Self {
        self.notice_delay = delay;
        self
    }

    /// Sets the image fingerprint mode.
    #[must_use]
    pub const fn with_image_mode(mut self, mode: ImageFingerprintMode) -> Self {
        self.image_mode = mode;
        self
    }

    /// Sets the per-call gateway timeout.
    #[must_use]
    pub const fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for a zero history size or a
    /// zero gateway timeout.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_history == 0 {
            return Err(crate::Error::Configuration(
                "max_history must be greater than 0".to_string(),
            ));
        }
        if self.gateway_timeout.is_zero() {
            return Err(crate::Error::Configuration(
                "gateway_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            max_history: 10_000,
            notice_delay: Duration::from_millis(2000),
            notice_text: DEFAULT_NOTICE_TEXT.to_string(),
            image_mode: ImageFingerprintMode::Base64,
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)?;
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %value, "Ignoring unparseable environment override");
    }
    parsed
}
