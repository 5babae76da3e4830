//! # Observability
//!
//! Logging and metrics setup for the bulk indexer.
//!
//! - `init_with_config` installs the `tracing` subscriber once per process and,
//!   when a port is given, the Prometheus exporter
//! - `init_metrics_only` adds the exporter after logging is already set up
//! - [`metrics`] holds the recording helpers called by the writer component and
//!   the `FlushMetricsAggregator` behind the end-of-run flush summary
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9000),
//!     default_log_level: "debug".to_string(),
//! })?;
//! observability::record_batch_flushed("elasticsearch", "bro", "count", 100);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_batch_flushed, record_default_config_used, record_flush_latency_ms,
    record_message_outcome, record_message_received, record_pending_depth,
    FlushMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// Logging and exporter settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus listener port (None = no exporter)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with file, line and thread
    #[default]
    Json,
    /// Multi-line, for terminals
    Pretty,
    /// One line per event
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => anyhow::bail!("unknown log format: {other}"),
        }
    }
}

/// Install the global subscriber, then the exporter if a port is set.
///
/// # Errors
/// Fails when a global subscriber or recorder is already installed, or the
/// exporter cannot bind its port.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    installed.context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Logging initialized"
    );
    Ok(())
}

/// Serve Prometheus metrics on `0.0.0.0:<port>`.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
