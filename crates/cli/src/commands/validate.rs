//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::IndexingConfig;
use serde::Serialize;
use tracing::info;
use writer::BatchTimeoutHelper;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    message_timeout_secs: u64,
    max_batch_timeout_secs: u64,
    date_format: String,
    sensor_count: usize,
    writers: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return invalid(config_path, format!("File not found: {}", args.config.display()));
    }

    let indexing = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(indexing) => indexing,
        Err(e) => return invalid(config_path, e.to_string()),
    };

    if let Err(e) = elasticsearch::validate_date_format(&indexing.global.date_format) {
        return invalid(config_path, e.to_string());
    }

    let warnings = collect_warnings(&indexing);
    let mut writers: Vec<String> = indexing
        .sensors
        .values()
        .flat_map(|writers| writers.keys().cloned())
        .collect();
    writers.sort();
    writers.dedup();

    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: (!warnings.is_empty()).then_some(warnings),
        summary: Some(ConfigSummary {
            message_timeout_secs: indexing.global.message_timeout_secs,
            max_batch_timeout_secs: max_batch_timeout_secs(&indexing),
            date_format: indexing.global.date_format.clone(),
            sensor_count: indexing.sensors.len(),
            writers,
        }),
    }
}

fn invalid(config_path: String, error: String) -> ValidationResult {
    ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: None,
        summary: None,
    }
}

fn max_batch_timeout_secs(indexing: &IndexingConfig) -> u64 {
    BatchTimeoutHelper::new(
        Vec::new,
        indexing.global.message_timeout_secs,
        indexing.global.batch_timeout_divisor,
    )
    .max_batch_timeout_secs()
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(indexing: &IndexingConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let max = max_batch_timeout_secs(indexing);

    if indexing.sensors.is_empty() {
        warnings.push(
            "No sensors configured - every sensor uses defaults (batch_size=1)".to_string(),
        );
    }

    for (sensor, writers) in &indexing.sensors {
        for (writer, config) in writers {
            if !config.enabled {
                warnings.push(format!(
                    "Sensor '{sensor}' writer '{writer}' is disabled - records are acked without being written"
                ));
            }
            if config.batch_timeout == 0 {
                warnings.push(format!(
                    "Sensor '{sensor}' writer '{writer}' has no batch_timeout - using the maximum of {max}s"
                ));
            } else if config.batch_timeout > max {
                warnings.push(format!(
                    "Sensor '{sensor}' writer '{writer}' batch_timeout {}s exceeds the maximum of {max}s and is capped",
                    config.batch_timeout
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Message timeout: {}s", summary.message_timeout_secs);
            println!("  Max batch timeout: {}s", summary.max_batch_timeout_secs);
            println!("  Date format: {}", summary.date_format);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Writers: {}", summary.writers.join(", "));
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
