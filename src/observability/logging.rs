//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Level used when none is configured or the configured one is invalid.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::DEBUG;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Maximum level emitted by this crate.
    pub level: LevelFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
    /// A level string that failed to parse, reported once logging is up.
    pub rejected_level: Option<String>,
    /// Raw `RUST_LOG` directives, used when no CLI level is given.
    pub directives: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            format: LogFormat::default(),
            file: None,
            rejected_level: None,
            directives: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from file settings, environment and CLI.
    ///
    /// Precedence: `cli_level`, then `RUST_LOG`, then `DEDUPBOT_LOG_*`
    /// variables, then the config file.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, cli_level: Option<&str>) -> Self {
        Self::resolve(settings, cli_level, |key| std::env::var(key).ok())
    }

    pub(crate) fn resolve<F>(
        settings: Option<&LoggingSettings>,
        cli_level: Option<&str>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if cli_level.is_none() {
            config.directives = lookup("RUST_LOG").filter(|d| !d.trim().is_empty());
        }

        let level = cli_level
            .map(str::to_string)
            .or_else(|| lookup("DEDUPBOT_LOG_LEVEL"))
            .or_else(|| settings.and_then(|s| s.level.clone()));
        if let Some(level) = level {
            match parse_level(&level) {
                Some(parsed) => config.level = parsed,
                None => config.rejected_level = Some(level),
            }
        }

        let format =
            lookup("DEDUPBOT_LOG_FORMAT").or_else(|| settings.and_then(|s| s.format.clone()));
        if let Some(format) = format.and_then(|f| f.parse().ok()) {
            config.format = format;
        }

        config.file = lookup("DEDUPBOT_LOG_FILE")
            .filter(|f| !f.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| settings.and_then(|s| s.file.clone()));

        config
    }

    /// Builds the subscriber filter.
    ///
    /// `RUST_LOG` directives win when present and valid. Otherwise this crate
    /// logs at the configured level and everything else is capped at `warn`.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        self.directives
            .as_deref()
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| EnvFilter::new("warn").add_directive(crate_directive(self.level)))
    }
}

/// Parses a level name, case-insensitively.
///
/// Returns `None` for anything that is not a standard level name.
#[must_use]
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

fn crate_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
    let target = env!("CARGO_CRATE_NAME");
    format!("{target}={level}")
        .parse()
        .unwrap_or_else(|_| level.into())
}
