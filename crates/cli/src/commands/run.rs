//! `run` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{BulkMessageWriter, IndexingConfig, JsonRecord};
use elasticsearch::{ElasticsearchClientConfig, ElasticsearchWriter, HttpBulkClient};
use tracing::{error, info, warn};
use writer::writers::{FileWriter, FileWriterConfig, LogWriter};

use crate::cli::{RunArgs, WriterKind};
use crate::error::CliError;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig, PipelineStats};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let indexing = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.writer == WriterKind::Elasticsearch {
        elasticsearch::validate_date_format(&indexing.global.date_format)
            .map_err(|e| CliError::config_validation(e.to_string()))?;
    }

    info!(
        writer = args.writer.name(),
        sensors = indexing.sensors.len(),
        message_timeout_secs = indexing.global.message_timeout_secs,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&indexing, args.writer);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        indexing: Arc::new(indexing),
        input: InputSource::parse(&args.input),
        tick_interval: (args.tick_interval > 0).then(|| Duration::from_secs(args.tick_interval)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");

    let stats = match args.writer {
        WriterKind::Elasticsearch => {
            let client = HttpBulkClient::new(ElasticsearchClientConfig {
                url: args.es_url.clone(),
                timeout: Duration::from_secs(args.es_timeout),
                username: args.es_username.clone(),
                password: args.es_password.clone(),
            })
            .map_err(|e| CliError::writer_setup(args.writer.name(), e.to_string()))?;
            info!(url = %args.es_url, "Elasticsearch client ready");
            run_with(pipeline, ElasticsearchWriter::new(Arc::new(client))).await?
        }
        WriterKind::File => {
            let writer = FileWriter::new(
                args.writer.name(),
                FileWriterConfig {
                    base_path: args.output_dir.clone(),
                },
            )
            .map_err(|e| CliError::writer_setup(args.writer.name(), e.to_string()))?;
            run_with(pipeline, writer).await?
        }
        WriterKind::Log => run_with(pipeline, LogWriter::new(args.writer.name())).await?,
    };

    info!(
        acked = stats.acked,
        failed = stats.failed,
        skipped = stats.records_skipped,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Pipeline completed"
    );
    if stats.unaccounted() > 0 {
        warn!(
            unaccounted = stats.unaccounted(),
            "Some records reached no terminal outcome"
        );
    }

    stats.print_summary();

    info!("Bulk Indexer finished");
    Ok(())
}

async fn run_with<W>(pipeline: Pipeline, writer: W) -> Result<PipelineStats>
where
    W: BulkMessageWriter<JsonRecord> + 'static,
{
    pipeline
        .run(Arc::new(writer), shutdown_signal())
        .await
        .context("Pipeline execution failed")
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(indexing: &IndexingConfig, writer: WriterKind) {
    println!("\n=== Configuration Summary ===\n");
    println!("Writer: {}", writer.name());
    println!("Global:");
    println!(
        "  Message timeout: {}s",
        indexing.global.message_timeout_secs
    );
    println!("  Date format: {}", indexing.global.date_format);
    println!(
        "  Batch timeout divisor: {}",
        indexing.global.batch_timeout_divisor
    );

    let configured: Vec<_> = indexing
        .sensors
        .iter()
        .filter_map(|(sensor, writers)| writers.get(writer.name()).map(|c| (sensor, c)))
        .collect();
    println!("\nSensors ({}):", configured.len());
    for (sensor, config) in configured {
        println!(
            "  - {} -> {} (batch_size={}, batch_timeout={}s{})",
            sensor,
            config.index.as_deref().unwrap_or(sensor.as_str()),
            config.batch_size,
            config.batch_timeout,
            if config.enabled { "" } else { ", disabled" }
        );
    }

    println!();
}
