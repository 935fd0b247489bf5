//! Configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, or `<config dir>/dedupbot/config.toml`)
//! 3. Environment variables (a `.env` file is loaded into the environment by
//!    the binary before this runs)
//! 4. Command-line flags, applied by the binary
//!
//! # Example file
//!
//! ```toml
//! [telegram]
//! token = "123456:ABC..."
//! username = "DeduplicationCheckerBot"
//! poll_timeout_secs = 30
//!
//! [deduplication]
//! max_history = 10000
//! notice_delay_ms = 2000
//! image_fingerprint = "base64"
//!
//! [observability.logging]
//! level = "info"
//! format = "json"
//!
//! [observability.metrics]
//! enabled = true
//! port = 9090
//! ```

use crate::gateway::TelegramSettings;
use crate::services::deduplication::DeduplicationConfig;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bot tokens issued by `BotFather` are at least this long.
pub const MIN_TOKEN_LEN: usize = 45;

/// Main configuration for the bot.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    /// Bot API connection settings.
    pub telegram: TelegramSettings,
    /// Deduplication and duplicate response settings.
    pub dedup: DeduplicationConfig,
    /// Logging and metrics settings, resolved by [`crate::observability`].
    pub observability: ObservabilitySettings,
    /// Config file the settings were read from, if any.
    pub source: Option<PathBuf>,
    /// Problems found while loading, to be logged once logging is up.
    pub warnings: Vec<String>,
}

/// Observability section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    pub metrics: Option<MetricsSettings>,
}

/// Logging settings from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Level: trace, debug, info, warn, error.
    pub level: Option<String>,
    /// Output format: pretty or json.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Metrics settings from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Port of the Prometheus scrape endpoint.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Telegram section.
    pub telegram: Option<ConfigFileTelegram>,
    /// Deduplication section.
    pub deduplication: Option<ConfigFileDeduplication>,
    /// Observability section.
    pub observability: Option<ObservabilitySettings>,
}

/// Telegram section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileTelegram {
    /// Bot token.
    pub token: Option<String>,
    /// Bot username.
    pub username: Option<String>,
    /// API base URL.
    pub api_base: Option<String>,
    /// Long-poll timeout in seconds.
    pub poll_timeout_secs: Option<u64>,
}

/// Deduplication section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDeduplication {
    /// Remembered fingerprints.
    pub max_history: Option<usize>,
    /// Notice retraction delay in milliseconds.
    pub notice_delay_ms: Option<u64>,
    /// Notice body.
    pub notice_text: Option<String>,
    /// `base64` or `sha256`.
    pub image_fingerprint: Option<String>,
    /// Per-call gateway timeout in milliseconds.
    pub gateway_timeout_ms: Option<u64>,
}

impl BotConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the file layer and applies environment overrides.
    ///
    /// An explicit `path` must exist and parse; without one the default
    /// location is tried and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;

        let mut config = Self::from_config_file(file)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/dedupbot/` on macOS)
    /// 2. XDG config dir (`~/.config/dedupbot/` for Unix compatibility)
    ///
    /// Returns default configuration if no usable config file is found. A file
    /// that exists but fails to parse is skipped and noted in
    /// [`warnings`](Self::warnings).
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("dedupbot").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("dedupbot")
                .join("config.toml"),
        ];

        let mut warnings = Vec::new();
        for candidate in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(candidate) {
                Ok(mut config) => {
                    config.warnings = warnings;
                    return config;
                },
                Err(e) => warnings.push(format!("ignoring config file: {e}")),
            }
        }

        Self {
            warnings,
            ..Self::default()
        }
    }

    /// Converts a `ConfigFile` to `BotConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(telegram) = file.telegram {
            if let Some(token) = telegram.token {
                config.telegram.token = SecretString::from(token);
            }
            if let Some(username) = telegram.username {
                config.telegram.username = username;
            }
            if let Some(api_base) = telegram.api_base {
                config.telegram.api_base = api_base;
            }
            if let Some(secs) = telegram.poll_timeout_secs {
                config.telegram.poll_timeout_secs = secs;
            }
        }
        if let Some(dedup) = file.deduplication {
            if let Some(max_history) = dedup.max_history {
                config.dedup.max_history = max_history;
            }
            if let Some(ms) = dedup.notice_delay_ms {
                config.dedup.notice_delay = Duration::from_millis(ms);
            }
            if let Some(text) = dedup.notice_text {
                config.dedup.notice_text = text;
            }
            if let Some(mode) = dedup.image_fingerprint {
                config.dedup.image_mode = mode.parse()?;
            }
            if let Some(ms) = dedup.gateway_timeout_ms {
                config.dedup.gateway_timeout = Duration::from_millis(ms);
            }
        }
        if let Some(observability) = file.observability {
            config.observability = observability;
        }

        Ok(config)
    }

    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides read through `lookup`.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `TELEGRAM_BOT_TOKEN` | `telegram.token` |
    /// | `TELEGRAM_BOT_USERNAME` | `telegram.username` |
    /// | `TELEGRAM_API_BASE` | `telegram.api_base` |
    /// | `DEDUPBOT_POLL_TIMEOUT_SECS` | `telegram.poll_timeout_secs` |
    /// | `DEDUPBOT_*` | see [`DeduplicationConfig`] |
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_blank("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = SecretString::from(token.trim().to_string());
        }
        if let Some(username) = non_blank("TELEGRAM_BOT_USERNAME") {
            self.telegram.username = username.trim().trim_start_matches('@').to_string();
        }
        if let Some(api_base) = non_blank("TELEGRAM_API_BASE") {
            self.telegram.api_base = api_base.trim().to_string();
        }
        if let Some(secs) = non_blank("DEDUPBOT_POLL_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
        {
            self.telegram.poll_timeout_secs = secs;
        }

        self.dedup.apply_env_from(&lookup);
    }

    /// Checks the settings needed to run the bot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the token is missing, the poll
    /// timeout is out of range, or the deduplication settings are invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.telegram.has_token() {
            return Err(Error::Configuration(
                "TELEGRAM_BOT_TOKEN is not set".to_string(),
            ));
        }
        self.telegram.validate_poll_timeout()?;
        self.dedup.validate()
    }

    /// Returns true if the token is shorter than any token `BotFather` issues.
    ///
    /// Only worth a warning; the API is the authority on validity.
    #[must_use]
    pub fn token_looks_truncated(&self) -> bool {
        let len = self.telegram.token.expose_secret().trim().len();
        len > 0 && len < MIN_TOKEN_LEN
    }
}
