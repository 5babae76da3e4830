//! # Integration Tests
//!
//! End-to-end runs across the workspace crates:
//! - config file -> batching component -> writer
//! - ack semantics for partial and whole-batch failures
//! - time-based flushes on a paused clock

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{IndexingWriterConfiguration, JsonRecord, MessageId};
    use elasticsearch::mock::MockBulkClient;
    use elasticsearch::{ElasticsearchWriter, WRITER_NAME};
    use serde_json::json;
    use writer::mock::{MockBulkWriter, RecordingSink};
    use writer::writers::{FileWriter, FileWriterConfig};
    use writer::{spawn_ticker, BatchTimeoutHelper, BulkWriterComponent};

    const CONFIG: &str = r#"
[global]
message_timeout_secs = 30
date_format = "%Y.%m.%d"

[sensors.bro.elasticsearch]
batch_size = 3
batch_timeout = 2

[sensors.snort.elasticsearch]
index = "ids"
batch_size = 2

[sensors.yaf.elasticsearch]
enabled = false

[sensors.bro.file]
batch_size = 2
"#;

    fn writer_config(writer: &str) -> Arc<IndexingWriterConfiguration> {
        let indexing = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        Arc::new(IndexingWriterConfiguration::new(writer, Arc::new(indexing)))
    }

    fn record(sensor: &str, n: u64) -> JsonRecord {
        json!({
            "guid": format!("{sensor}-{n}"),
            "source.type": sensor,
            "timestamp": 1_700_000_000_000u64 + n,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    /// Config file -> component -> Elasticsearch writer -> sink
    #[tokio::test]
    async fn test_e2e_partial_failure() {
        let config = writer_config(WRITER_NAME);
        let sink = Arc::new(RecordingSink::new());
        let component = BulkWriterComponent::new(Arc::clone(&sink), Duration::from_secs(15));
        let client = Arc::new(MockBulkClient::new().failing_positions(&[1]));
        let writer = ElasticsearchWriter::new(Arc::clone(&client));

        for n in 1..=3 {
            component
                .write("bro", n, record("bro", n), &writer, config.as_ref())
                .await;
        }

        assert_eq!(
            sink.acked(),
            vec![MessageId::from(1u64), MessageId::from(3u64)]
        );
        assert_eq!(sink.failed().len(), 1);
        assert_eq!(sink.failed()[0].0, MessageId::from(2u64));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains(r#""_index":"bro_index_"#));
        assert_eq!(component.pending_total().await, 0);
    }

    #[tokio::test]
    async fn test_e2e_configured_index_and_transport_failure() {
        let config = writer_config(WRITER_NAME);
        let sink = Arc::new(RecordingSink::new());
        let component = BulkWriterComponent::new(Arc::clone(&sink), Duration::from_secs(15));
        let client = Arc::new(MockBulkClient::new());
        client.set_transport_failure(true);
        let writer = ElasticsearchWriter::new(Arc::clone(&client));

        for n in 1..=2 {
            component
                .write("snort", n, record("snort", n), &writer, config.as_ref())
                .await;
        }

        assert!(client.requests()[0].contains(r#""_index":"ids_index_"#));
        assert!(sink.acked().is_empty());
        let failed = sink.failed();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|(_, message)| message == "connection refused"));

        // the next batch is unaffected
        client.set_transport_failure(false);
        for n in 3..=4 {
            component
                .write("snort", n, record("snort", n), &writer, config.as_ref())
                .await;
        }
        assert_eq!(sink.acked().len(), 2);
        assert_eq!(sink.terminal_count(), 4);
    }

    #[tokio::test]
    async fn test_e2e_disabled_sensor_acked_without_write() {
        let config = writer_config(WRITER_NAME);
        let sink = Arc::new(RecordingSink::new());
        let component = BulkWriterComponent::new(Arc::clone(&sink), Duration::from_secs(15));
        let client = Arc::new(MockBulkClient::new());
        let writer = ElasticsearchWriter::new(Arc::clone(&client));

        component
            .write("yaf", 1u64, record("yaf", 1), &writer, config.as_ref())
            .await;

        assert_eq!(sink.acked(), vec![MessageId::from(1u64)]);
        assert!(client.requests().is_empty());
    }

    /// A lone record flushes once its timeout passes, driven by the ticker.
    #[tokio::test(start_paused = true)]
    async fn test_e2e_timeout_flush_via_ticker() {
        let config = writer_config(WRITER_NAME);
        let helper = BatchTimeoutHelper::from_configuration(Arc::clone(&config));
        assert_eq!(helper.max_batch_timeout_secs(), 15);
        assert_eq!(helper.recommended_tick_interval_secs(), 1);

        let sink = Arc::new(RecordingSink::new());
        let component = Arc::new(BulkWriterComponent::new(
            Arc::clone(&sink),
            helper.max_batch_timeout(),
        ));
        let client = Arc::new(MockBulkClient::new());
        let writer = Arc::new(ElasticsearchWriter::new(Arc::clone(&client)));

        component
            .write("bro", 1u64, record("bro", 1), writer.as_ref(), config.as_ref())
            .await;
        let ticker = spawn_ticker(
            Arc::clone(&component),
            Arc::clone(&writer),
            Arc::clone(&config),
            helper.recommended_tick_interval(),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(sink.acked().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.acked(), vec![MessageId::from(1u64)]);
        assert_eq!(client.requests().len(), 1);

        ticker.shutdown().await;
    }

    /// Every record lands in exactly one flushed batch, in write order.
    #[tokio::test]
    async fn test_e2e_every_record_flushed_once() {
        let indexing = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let config = IndexingWriterConfiguration::new(WRITER_NAME, Arc::new(indexing));
        let sink = Arc::new(RecordingSink::new());
        let component = BulkWriterComponent::new(Arc::clone(&sink), Duration::from_secs(15));
        let writer = MockBulkWriter::<JsonRecord>::new(WRITER_NAME);

        for n in 1..=10u64 {
            let sensor = if n % 2 == 0 { "bro" } else { "snort" };
            component
                .write(sensor, n, record(sensor, n), &writer, &config)
                .await;
        }
        component.flush_all(&writer, &config).await;

        let mut bro = Vec::new();
        let mut snort = Vec::new();
        for (key, batch) in writer.batches() {
            let ids = batch.iter().map(|m| m.id.clone());
            match key.as_str() {
                "bro" => bro.extend(ids),
                "snort" => snort.extend(ids),
                other => panic!("unexpected key {other}"),
            }
        }
        let expected = |parity: u64| -> Vec<MessageId> {
            (1..=10u64)
                .filter(|n| n % 2 == parity)
                .map(MessageId::from)
                .collect()
        };
        assert_eq!(bro, expected(0));
        assert_eq!(snort, expected(1));
        assert_eq!(sink.acked().len(), 10);
        assert_eq!(sink.terminal_count(), 10);
    }

    #[tokio::test]
    async fn test_e2e_file_writer() {
        let dir = tempfile::tempdir().unwrap();
        let config = writer_config("file");
        let sink = Arc::new(RecordingSink::new());
        let component = BulkWriterComponent::new(Arc::clone(&sink), Duration::from_secs(15));
        let writer = FileWriter::new(
            "file",
            FileWriterConfig {
                base_path: dir.path().to_path_buf(),
            },
        )
        .unwrap();

        for n in 1..=3 {
            component
                .write("bro", n, record("bro", n), &writer, config.as_ref())
                .await;
        }
        component.flush_all(&writer, config.as_ref()).await;

        let content = std::fs::read_to_string(writer.path_for("bro")).unwrap();
        let guids: Vec<String> = content
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["guid"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(guids, vec!["bro-1", "bro-2", "bro-3"]);
        assert_eq!(sink.acked().len(), 3);
    }
}
