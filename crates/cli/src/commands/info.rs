//! `info` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{IndexingConfig, IndexingWriterConfiguration, WriterConfiguration};
use serde::Serialize;
use tracing::info;
use writer::BatchTimeoutHelper;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    writer: String,
    global: GlobalInfo,
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct GlobalInfo {
    message_timeout_secs: u64,
    batch_timeout_divisor: u32,
    max_batch_timeout_secs: u64,
    recommended_tick_secs: u64,
    date_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_id_field: Option<String>,
}

#[derive(Serialize)]
struct SensorInfo {
    sensor: String,
    index: String,
    batch_size: usize,
    /// Configured value, 0 = default
    batch_timeout_secs: u64,
    /// Value the time policy applies
    effective_timeout_secs: u64,
    enabled: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let indexing = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let config_info = build_config_info(Arc::new(indexing), args.writer.name());
    if args.json {
        let json = serde_json::to_string_pretty(&config_info)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config_info);
    }

    Ok(())
}

fn build_config_info(indexing: Arc<IndexingConfig>, writer: &str) -> ConfigInfo {
    let config = Arc::new(IndexingWriterConfiguration::new(
        writer,
        Arc::clone(&indexing),
    ));
    let helper = BatchTimeoutHelper::from_configuration(Arc::clone(&config));
    let max = helper.max_batch_timeout_secs();

    let sensors = indexing
        .sensors
        .iter()
        .filter(|(_, writers)| writers.contains_key(writer))
        .map(|(sensor, _)| {
            let configured = config.batch_timeout(sensor);
            SensorInfo {
                sensor: sensor.clone(),
                index: config.index(sensor),
                batch_size: config.batch_size(sensor),
                batch_timeout_secs: configured,
                effective_timeout_secs: if configured == 0 || configured > max {
                    max
                } else {
                    configured
                },
                enabled: config.is_enabled(sensor),
            }
        })
        .collect();

    let global = &indexing.global;
    ConfigInfo {
        writer: writer.to_string(),
        global: GlobalInfo {
            message_timeout_secs: global.message_timeout_secs,
            batch_timeout_divisor: global.batch_timeout_divisor,
            max_batch_timeout_secs: max,
            recommended_tick_secs: helper.recommended_tick_interval_secs(),
            date_format: global.date_format.clone(),
            document_id_field: global.document_id_field.clone(),
        },
        sensors,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Bulk Indexer Configuration ({}) ===\n", info.writer);

    let global = &info.global;
    println!("Global");
    println!("   ├─ Message timeout: {}s", global.message_timeout_secs);
    println!("   ├─ Batch timeout divisor: {}", global.batch_timeout_divisor);
    println!("   ├─ Max batch timeout: {}s", global.max_batch_timeout_secs);
    println!("   ├─ Recommended tick: {}s", global.recommended_tick_secs);
    println!("   ├─ Date format: {}", global.date_format);
    match &global.document_id_field {
        Some(field) => println!("   └─ Document id field: {}", field),
        None => println!("   └─ Document id field: (backend assigned)"),
    }

    println!("\nSensors ({})", info.sensors.len());
    for (i, sensor) in info.sensors.iter().enumerate() {
        let prefix = if i == info.sensors.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} -> {} (batch_size={}, timeout={}s{})",
            prefix,
            sensor.sensor,
            sensor.index,
            sensor.batch_size,
            sensor.effective_timeout_secs,
            if sensor.enabled { "" } else { ", disabled" }
        );
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorWriterConfig;
    use std::collections::BTreeMap;

    #[test]
    fn test_build_config_info() {
        let mut indexing = IndexingConfig::default();
        indexing.global.message_timeout_secs = 60;
        indexing.sensors.insert(
            "bro".to_string(),
            BTreeMap::from([(
                "elasticsearch".to_string(),
                SensorWriterConfig {
                    index: Some("bro_idx".to_string()),
                    batch_size: 50,
                    batch_timeout: 8,
                    enabled: true,
                },
            )]),
        );
        indexing.sensors.insert(
            "yaf".to_string(),
            BTreeMap::from([("file".to_string(), SensorWriterConfig::default())]),
        );

        let info = build_config_info(Arc::new(indexing), "elasticsearch");

        assert_eq!(info.global.max_batch_timeout_secs, 30);
        assert_eq!(info.global.recommended_tick_secs, 4);
        assert_eq!(info.sensors.len(), 1);
        assert_eq!(info.sensors[0].index, "bro_idx");
        assert_eq!(info.sensors[0].effective_timeout_secs, 8);
    }
}
