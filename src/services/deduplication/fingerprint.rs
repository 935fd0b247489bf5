//! Fingerprint generation for deduplication.
//!
//! Maps a sender and a piece of content onto a canonical key of the form
//! `<sender>:<kind>:<payload>`. Two messages are duplicates exactly when their
//! fingerprints are equal.

use crate::models::{ContentKind, SenderId};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Canonical deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already canonical key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the fingerprint in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the fingerprint is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How image bytes are reduced into the fingerprint payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFingerprintMode {
    /// Embed the full base64 encoding of the bytes.
    #[default]
    Base64,
    /// Embed the hex SHA-256 digest of the bytes (fixed 64 chars).
    Sha256,
}

impl ImageFingerprintMode {
    /// Returns the configuration name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Sha256 => "sha256",
        }
    }
}

impl FromStr for ImageFingerprintMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "sha256" | "digest" => Ok(Self::Sha256),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown image fingerprint mode: {other}"
            ))),
        }
    }
}

/// Fingerprint generator.
///
/// # Canonical payloads
///
/// | Kind | Payload |
/// |------|---------|
/// | Text | trimmed, whitespace-collapsed, lowercased text |
/// | Image | base64 of the bytes, or hex SHA-256 in [`ImageFingerprintMode::Sha256`] |
/// | Animation | platform file handle, verbatim |
///
/// # Example
///
/// ```rust
/// use dedupbot::{ContentKind, FingerprintGenerator, SenderId};
///
/// let generator = FingerprintGenerator::default();
/// let a = generator.generate(SenderId::new(1), &ContentKind::Text("Test  Message".into()));
/// let b = generator.generate(SenderId::new(1), &ContentKind::Text("test message".into()));
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "1:text:test message");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintGenerator {
    image_mode: ImageFingerprintMode,
}

impl FingerprintGenerator {
    /// Creates a generator with the given image mode.
    #[must_use]
    pub const fn new(image_mode: ImageFingerprintMode) -> Self {
        Self { image_mode }
    }

    /// Returns the configured image mode.
    #[must_use]
    pub const fn image_mode(&self) -> ImageFingerprintMode {
        self.image_mode
    }

    /// Computes the fingerprint of a sender's content.
    #[must_use]
    pub fn generate(&self, sender: SenderId, content: &ContentKind) -> Fingerprint {
        let payload = match content {
            ContentKind::Text(text) => Self::normalize(text),
            ContentKind::Image(bytes) => self.encode_image(bytes),
            ContentKind::Animation(file_id) => file_id.clone(),
        };
        let fingerprint = Fingerprint(format!("{sender}:{}:{payload}", content.tag()));

        tracing::debug!(
            sender = %sender,
            kind = content.tag(),
            fingerprint_len = fingerprint.len(),
            "Generated fingerprint"
        );
        fingerprint
    }

    fn encode_image(&self, bytes: &[u8]) -> String {
        match self.image_mode {
            ImageFingerprintMode::Base64 => STANDARD.encode(bytes),
            ImageFingerprintMode::Sha256 => hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Normalizes text for comparison.
    ///
    /// Normalization steps:
    /// 1. Trim leading/trailing whitespace
    /// 2. Collapse runs of whitespace to a single space
    /// 3. Convert to lowercase
    ///
    /// # Example
    ///
    /// ```rust
    /// use dedupbot::FingerprintGenerator;
    ///
    /// assert_eq!(FingerprintGenerator::normalize("  Hello \n  WORLD  "), "hello world");
    /// ```
    #[must_use]
    pub fn normalize(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
