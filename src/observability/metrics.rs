//! Prometheus metrics.
//!
//! Counters and gauges are recorded through the `metrics` facade throughout
//! the crate; this module only installs the recorder and scrape endpoint.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `dedup_messages_total` | counter | `outcome` |
//! | `dedup_store_evictions_total` | counter | |
//! | `dedup_store_size` | gauge | |
//! | `dedup_fingerprint_duration_ms` | histogram | `kind` |
//! | `gateway_failures_total` | counter | `operation` |

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default scrape port.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: listen_addr(DEFAULT_METRICS_PORT),
        }
    }
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    pub(crate) fn resolve<F>(settings: Option<&MetricsSettings>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = settings.and_then(|config| config.enabled).unwrap_or(false);
        let port = settings
            .and_then(|config| config.port)
            .unwrap_or(DEFAULT_METRICS_PORT);

        let mut config = Self {
            enabled,
            listen_addr: listen_addr(port),
        };

        if let Some(enabled) = lookup("DEDUPBOT_METRICS_ENABLED").map(|v| parse_bool(&v)) {
            config.enabled = enabled;
        }
        if let Some(port) = lookup("DEDUPBOT_METRICS_PORT").and_then(|v| v.trim().parse().ok()) {
            config.listen_addr = listen_addr(port);
        }

        config
    }
}

/// Installs the Prometheus recorder and HTTP scrape listener.
///
/// Returns the scrape address, or `None` when metrics are disabled.
///
/// Must be called from inside a tokio runtime; the listener runs as a task on
/// that runtime.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if there is no runtime, the listener
/// cannot be built, or a global recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<SocketAddr>> {
    if !config.enabled {
        return Ok(None);
    }

    let runtime = tokio::runtime::Handle::try_current().map_err(|e| Error::OperationFailed {
        operation: "metrics_exporter_build".to_string(),
        cause: e.to_string(),
    })?;

    let builder = PrometheusBuilder::new().with_http_listener(config.listen_addr);
    let (recorder, exporter) = {
        let _guard = runtime.enter();
        builder.build().map_err(|e| Error::OperationFailed {
            operation: "metrics_exporter_build".to_string(),
            cause: e.to_string(),
        })?
    };
    set_global_recorder(recorder)?;
    runtime.spawn(exporter);

    tracing::info!(listen_addr = %config.listen_addr, "Prometheus metrics exporter listening");
    Ok(Some(config.listen_addr))
}

fn set_global_recorder(recorder: PrometheusRecorder) -> Result<()> {
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })
}

const fn listen_addr(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "true" || value == "1" || value == "yes"
}
