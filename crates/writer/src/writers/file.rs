//! FileWriter - appends batches to NDJSON files, one file per destination

use contracts::{
    BulkMessage, BulkMessageWriter, BulkWriterResults, ContractError, JsonRecord, MessageId,
    WriterConfiguration,
};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

use crate::error::WriterError;

/// Configuration for FileWriter
#[derive(Debug, Clone)]
pub struct FileWriterConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileWriterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Writer appending each record as one JSON line to `<base>/<destination>.json`
pub struct FileWriter {
    name: String,
    config: FileWriterConfig,
}

impl FileWriter {
    /// Create a new FileWriter, creating the base directory if needed
    pub fn new(name: impl Into<String>, config: FileWriterConfig) -> Result<Self, WriterError> {
        let name = name.into();
        fs::create_dir_all(&config.base_path).map_err(|e| {
            WriterError::creation(
                &name,
                format!("cannot create {}: {e}", config.base_path.display()),
            )
        })?;

        Ok(Self { name, config })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, WriterError> {
        Self::new(name, FileWriterConfig::from_params(params))
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Path of the file receiving `destination`
    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.config.base_path.join(format!("{destination}.json"))
    }

    /// Render the batch as NDJSON, grouped by destination in first-seen order.
    fn render(messages: &[BulkMessage<JsonRecord>]) -> std::io::Result<Vec<(&str, Vec<u8>)>> {
        let mut order: Vec<(&str, Vec<u8>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for message in messages {
            let slot = *index.entry(message.destination.as_str()).or_insert_with(|| {
                order.push((message.destination.as_str(), Vec::new()));
                order.len() - 1
            });
            let buf = &mut order[slot].1;
            serde_json::to_writer(&mut *buf, &message.message)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            buf.push(b'\n');
        }
        Ok(order)
    }

    fn append(&self, messages: &[BulkMessage<JsonRecord>]) -> std::io::Result<()> {
        for (destination, lines) in Self::render(messages)? {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(destination))?;
            file.write_all(&lines)?;
        }
        Ok(())
    }
}

impl BulkMessageWriter<JsonRecord> for FileWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_writer_write",
        skip_all,
        fields(writer = %self.name, sensor = key, batch_size = messages.len())
    )]
    async fn write(
        &self,
        key: &str,
        _config: &dyn WriterConfiguration,
        messages: &[BulkMessage<JsonRecord>],
    ) -> Result<BulkWriterResults<MessageId>, ContractError> {
        self.append(messages).map_err(|e| {
            error!(writer = %self.name, sensor = key, error = %e, "Write failed");
            ContractError::transport_from(&self.name, e)
        })?;

        Ok(BulkWriterResults::all_succeeded(
            messages.iter().map(|m| m.id.clone()),
        ))
    }

    #[instrument(name = "file_writer_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        debug!(writer = %self.name, "FileWriter closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::writer_config;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(value: serde_json::Value) -> JsonRecord {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_file_writer_appends_per_destination() {
        let dir = tempdir().unwrap();
        let writer = FileWriter::new(
            "file",
            FileWriterConfig {
                base_path: dir.path().to_path_buf(),
            },
        )
        .unwrap();
        let config = writer_config("file", &[]);

        let batch = vec![
            BulkMessage::new(1u64, record(json!({"n": 1})), "bro"),
            BulkMessage::new(2u64, record(json!({"n": 2})), "snort"),
            BulkMessage::new(3u64, record(json!({"n": 3})), "bro"),
        ];
        let results = writer.write("bro", &config, &batch).await.unwrap();
        assert_eq!(results.successes().len(), 3);

        writer
            .write("bro", &config, &batch[..1])
            .await
            .unwrap();

        let bro = fs::read_to_string(writer.path_for("bro")).unwrap();
        let lines: Vec<_> = bro.lines().collect();
        assert_eq!(lines, vec![r#"{"n":1}"#, r#"{"n":3}"#, r#"{"n":1}"#]);

        let snort = fs::read_to_string(writer.path_for("snort")).unwrap();
        assert_eq!(snort.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_io_error_is_transport_failure() {
        let dir = tempdir().unwrap();
        let writer = FileWriter::new(
            "file",
            FileWriterConfig {
                base_path: dir.path().to_path_buf(),
            },
        )
        .unwrap();
        // a directory where the file should be
        fs::create_dir_all(writer.path_for("bro")).unwrap();
        let config = writer_config("file", &[]);

        let batch = vec![BulkMessage::new(1u64, record(json!({"n": 1})), "bro")];
        let err = writer.write("bro", &config, &batch).await.unwrap_err();
        assert!(matches!(err, ContractError::Transport { .. }));
    }

    #[test]
    fn test_from_params_default_path() {
        let config = FileWriterConfig::from_params(&HashMap::new());
        assert_eq!(config.base_path, PathBuf::from("./output"));
    }
}
