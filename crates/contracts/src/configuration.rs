//! Resolved writer configuration
//!
//! `IndexingConfig` is the snapshot loaded by the config loader. Writers and
//! flush policies only see it through the `WriterConfiguration` trait, scoped to
//! one writer name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Batch size used when a destination has no explicit configuration
pub const DEFAULT_BATCH_SIZE: usize = 1;
/// Batch timeout meaning "use the derived default"
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 0;
/// Upstream acknowledgement timeout assumed when none is configured
pub const DEFAULT_MESSAGE_TIMEOUT_SECS: u64 = 30;
/// Largest accepted upstream acknowledgement timeout (one day)
pub const MAX_MESSAGE_TIMEOUT_SECS: u64 = 86_400;
/// Index time-partition suffix format (chrono syntax)
pub const DEFAULT_DATE_FORMAT: &str = "%Y.%m.%d.%H";

/// Complete configuration snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Settings shared by all destinations
    #[serde(default)]
    pub global: GlobalConfig,

    /// Sensor type -> writer name -> settings
    #[serde(default)]
    pub sensors: BTreeMap<String, BTreeMap<String, SensorWriterConfig>>,
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Seconds the upstream waits for an ack before replaying a record
    #[serde(default = "default_message_timeout")]
    pub message_timeout_secs: u64,

    /// Date format of the time-partition index suffix
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Record field used as document id (None = backend assigned)
    #[serde(default)]
    pub document_id_field: Option<String>,

    /// Number of daisy-chained writers sharing the end-to-end latency budget
    #[serde(default = "default_divisor")]
    pub batch_timeout_divisor: u32,

    /// Explicit tick interval in seconds (0 = derive from timeouts)
    #[serde(default)]
    pub tick_interval_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            message_timeout_secs: default_message_timeout(),
            date_format: default_date_format(),
            document_id_field: None,
            batch_timeout_divisor: default_divisor(),
            tick_interval_secs: 0,
        }
    }
}

fn default_message_timeout() -> u64 {
    DEFAULT_MESSAGE_TIMEOUT_SECS
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_divisor() -> u32 {
    1
}

/// Settings of one writer for one sensor type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorWriterConfig {
    /// Target index / table (None = sensor type)
    #[serde(default)]
    pub index: Option<String>,

    /// Records per batch, >= 1
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds before a partial batch is flushed (0 = default)
    #[serde(default)]
    pub batch_timeout: u64,

    /// Disabled destinations are acknowledged without being written
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SensorWriterConfig {
    fn default() -> Self {
        Self {
            index: None,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_enabled() -> bool {
    true
}

/// Per-destination view of the configuration consumed by the writer component.
pub trait WriterConfiguration: Send + Sync {
    fn batch_size(&self, destination: &str) -> usize;

    /// Seconds; 0 means "use the default timeout".
    fn batch_timeout(&self, destination: &str) -> u64;

    /// Every explicitly configured batch timeout, across destinations.
    fn all_configured_timeouts(&self) -> Vec<u64>;

    fn index(&self, destination: &str) -> String;

    fn is_enabled(&self, destination: &str) -> bool;

    /// The destination has no configuration and runs on defaults.
    fn is_default(&self, destination: &str) -> bool;

    fn global(&self) -> &GlobalConfig;
}

/// `WriterConfiguration` backed by an `IndexingConfig` snapshot.
#[derive(Debug, Clone)]
pub struct IndexingWriterConfiguration {
    writer_name: String,
    config: Arc<IndexingConfig>,
}

impl IndexingWriterConfiguration {
    pub fn new(writer_name: impl Into<String>, config: Arc<IndexingConfig>) -> Self {
        Self {
            writer_name: writer_name.into(),
            config,
        }
    }

    pub fn writer_name(&self) -> &str {
        &self.writer_name
    }

    fn sensor(&self, destination: &str) -> Option<&SensorWriterConfig> {
        self.config
            .sensors
            .get(destination)
            .and_then(|writers| writers.get(&self.writer_name))
    }
}

impl WriterConfiguration for IndexingWriterConfiguration {
    fn batch_size(&self, destination: &str) -> usize {
        self.sensor(destination)
            .map(|s| s.batch_size.max(1))
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    fn batch_timeout(&self, destination: &str) -> u64 {
        self.sensor(destination)
            .map(|s| s.batch_timeout)
            .unwrap_or(DEFAULT_BATCH_TIMEOUT_SECS)
    }

    fn all_configured_timeouts(&self) -> Vec<u64> {
        self.config
            .sensors
            .values()
            .filter_map(|writers| writers.get(&self.writer_name))
            .map(|s| s.batch_timeout)
            .collect()
    }

    fn index(&self, destination: &str) -> String {
        self.sensor(destination)
            .and_then(|s| s.index.clone())
            .unwrap_or_else(|| destination.to_string())
    }

    fn is_enabled(&self, destination: &str) -> bool {
        self.sensor(destination).map(|s| s.enabled).unwrap_or(true)
    }

    fn is_default(&self, destination: &str) -> bool {
        self.sensor(destination).is_none()
    }

    fn global(&self) -> &GlobalConfig {
        &self.config.global
    }
}

/// Configuration for writers that cannot batch: every destination flushes
/// after each record.
#[derive(Debug, Clone)]
pub struct SingleMessageConfiguration<C> {
    inner: C,
}

impl<C: WriterConfiguration> SingleMessageConfiguration<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: WriterConfiguration> WriterConfiguration for SingleMessageConfiguration<C> {
    fn batch_size(&self, _destination: &str) -> usize {
        1
    }

    fn batch_timeout(&self, destination: &str) -> u64 {
        self.inner.batch_timeout(destination)
    }

    fn all_configured_timeouts(&self) -> Vec<u64> {
        self.inner.all_configured_timeouts()
    }

    fn index(&self, destination: &str) -> String {
        self.inner.index(destination)
    }

    fn is_enabled(&self, destination: &str) -> bool {
        self.inner.is_enabled(destination)
    }

    fn is_default(&self, destination: &str) -> bool {
        self.inner.is_default(destination)
    }

    fn global(&self) -> &GlobalConfig {
        self.inner.global()
    }
}
