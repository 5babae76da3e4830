//! Pipeline orchestrator - reads records and drives the writer component.
//!
//! One record per input line. The record's `source.type` field is its
//! destination key; lines that are not JSON objects or carry no sensor type
//! are skipped. On EOF or shutdown every pending batch is drained before the
//! statistics are returned.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{BulkMessageWriter, IndexingConfig, IndexingWriterConfiguration, JsonRecord};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use writer::{spawn_ticker, BatchTimeoutHelper, BulkWriterComponent};

use super::{CountingSink, PipelineStats};
use crate::error::CliError;

/// Where records are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `-` is stdin, anything else a file path
    pub fn parse(input: &str) -> Self {
        if input == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(input))
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    async fn open(&self) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
        match self {
            Self::Stdin => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
            Self::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| CliError::input(self.describe(), e.to_string()))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration snapshot
    pub indexing: Arc<IndexingConfig>,

    /// Record source
    pub input: InputSource,

    /// Tick interval override (None = derive from configuration)
    pub tick_interval: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Read input until EOF or `shutdown` resolves, then drain.
    pub async fn run<W>(
        self,
        writer: Arc<W>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineStats>
    where
        W: BulkMessageWriter<JsonRecord> + 'static,
    {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let writer_config = Arc::new(IndexingWriterConfiguration::new(
            writer.name(),
            Arc::clone(&self.config.indexing),
        ));
        let mut helper = BatchTimeoutHelper::from_configuration(Arc::clone(&writer_config));
        if let Some(tick) = self.config.tick_interval {
            helper = helper.with_tick_override(tick.as_secs());
        }
        let tick_interval = helper.recommended_tick_interval();

        let sink = Arc::new(CountingSink::new());
        let component = Arc::new(BulkWriterComponent::new(
            Arc::clone(&sink),
            helper.max_batch_timeout(),
        ));

        info!(
            writer = writer.name(),
            input = %self.config.input.describe(),
            max_batch_timeout_secs = helper.max_batch_timeout_secs(),
            tick_interval_secs = tick_interval.as_secs(),
            "Pipeline configured"
        );

        let reader = self.config.input.open().await?;
        let ticker = spawn_ticker(
            Arc::clone(&component),
            Arc::clone(&writer),
            Arc::clone(&writer_config),
            tick_interval,
        );

        let mut stats = PipelineStats {
            tick_interval,
            ..Default::default()
        };
        let mut lines = reader.lines();
        let mut line_no = 0u64;
        let mut read_error = None;
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(line = line_no, "Shutdown requested, draining pending batches");
                    break;
                }
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    line_no += 1;
                    let Some((sensor, record)) = route(line_no, &line) else {
                        if !line.trim().is_empty() {
                            stats.records_skipped += 1;
                        }
                        continue;
                    };
                    stats.records_read += 1;
                    component
                        .write(&sensor, line_no, record, writer.as_ref(), writer_config.as_ref())
                        .await;
                }
                Ok(None) => {
                    debug!(lines = line_no, "End of input");
                    break;
                }
                Err(e) => {
                    read_error = Some(CliError::input(
                        self.config.input.describe(),
                        format!("line {}: {e}", line_no + 1),
                    ));
                    break;
                }
            }
        }

        // Stop timeout flushes before draining
        ticker.shutdown().await;
        let drained = component
            .flush_all(writer.as_ref(), writer_config.as_ref())
            .await;
        info!(batches = drained.len(), "Pending batches drained");

        if let Err(e) = writer.close().await {
            warn!(writer = writer.name(), error = %e, "Error closing writer");
        }

        if let Some(e) = read_error {
            return Err(e).context("Pipeline input failed");
        }

        stats.acked = sink.acked();
        stats.failed = sink.failed();
        stats.flushes = component.flush_summary();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            acked = stats.acked,
            failed = stats.failed,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Parse one input line into its destination key and record.
fn route(line_no: u64, line: &str) -> Option<(String, JsonRecord)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let record: JsonRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            warn!(line = line_no, error = %e, "Skipping malformed record");
            return None;
        }
    };

    match contracts::sensor_type(&record) {
        Some(sensor) => Some((sensor.to_string(), record)),
        None => {
            warn!(
                line = line_no,
                field = contracts::SENSOR_TYPE_FIELD,
                "Skipping record without sensor type"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorWriterConfig;
    use std::collections::BTreeMap;
    use std::io::Write;
    use writer::mock::MockBulkWriter;

    fn indexing(batch_size: usize) -> Arc<IndexingConfig> {
        let mut config = IndexingConfig::default();
        config.sensors.insert(
            "bro".to_string(),
            BTreeMap::from([(
                "mock".to_string(),
                SensorWriterConfig {
                    index: None,
                    batch_size,
                    batch_timeout: 0,
                    enabled: true,
                },
            )]),
        );
        Arc::new(config)
    }

    fn input_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_route() {
        let (sensor, record) = route(1, r#"{"source.type":"bro","a":1}"#).unwrap();
        assert_eq!(sensor, "bro");
        assert_eq!(record["a"], 1);

        assert!(route(2, "not json").is_none());
        assert!(route(3, r#"{"a":1}"#).is_none());
        assert!(route(4, "   ").is_none());
    }

    #[test]
    fn test_input_source_parse() {
        assert_eq!(InputSource::parse("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::parse("events.json"),
            InputSource::File(PathBuf::from("events.json"))
        );
    }

    #[tokio::test]
    async fn test_run_drains_on_eof() {
        let file = input_file(&[
            r#"{"source.type":"bro","n":1}"#,
            r#"{"source.type":"bro","n":2}"#,
            "garbage",
            r#"{"source.type":"bro","n":3}"#,
            r#"{"source.type":"snort","n":4}"#,
        ]);
        let writer = Arc::new(MockBulkWriter::<JsonRecord>::new("mock"));
        let pipeline = Pipeline::new(PipelineConfig {
            indexing: indexing(2),
            input: InputSource::File(file.path().to_path_buf()),
            tick_interval: None,
            metrics_port: None,
        });

        let stats = pipeline
            .run(Arc::clone(&writer), std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.records_read, 4);
        assert_eq!(stats.records_skipped, 1);
        assert_eq!(stats.acked, 4);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.unaccounted(), 0);
        // bro flushes once on count; unconfigured snort flushes at the
        // default size of 1; the last bro record is drained
        assert_eq!(writer.batches().len(), 3);
        assert_eq!(stats.flushes.trigger_counts.get("count"), Some(&2));
        assert_eq!(stats.flushes.trigger_counts.get("shutdown"), Some(&1));
    }

    #[tokio::test]
    async fn test_run_counts_failures() {
        let file = input_file(&[
            r#"{"source.type":"bro","n":1}"#,
            r#"{"source.type":"bro","n":2}"#,
        ]);
        let writer = Arc::new(MockBulkWriter::<JsonRecord>::new("mock"));
        writer.set_transport_failure(true);
        let pipeline = Pipeline::new(PipelineConfig {
            indexing: indexing(2),
            input: InputSource::File(file.path().to_path_buf()),
            tick_interval: None,
            metrics_port: None,
        });

        let stats = pipeline
            .run(Arc::clone(&writer), std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.acked, 0);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_missing_input_file_is_error() {
        let pipeline = Pipeline::new(PipelineConfig {
            indexing: indexing(2),
            input: InputSource::File(PathBuf::from("/nonexistent/input.ndjson")),
            tick_interval: None,
            metrics_port: None,
        });

        let result = pipeline
            .run(Arc::new(MockBulkWriter::<JsonRecord>::new("mock")), std::future::pending())
            .await;
        assert!(result.is_err());
    }
}
