//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bulk Indexer - batches telemetry records into bulk writes
#[derive(Parser, Debug)]
#[command(
    name = "bulk-indexer",
    author,
    version,
    about = "Batch telemetry records into bulk writes",
    long_about = "Reads newline-delimited JSON telemetry records, batches them per sensor type \n\
                  and submits each batch to a bulk writer (Elasticsearch, files or the log). \n\
                  Batches flush on size or on timeout; every record is acked or failed."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BULK_INDEXER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BULK_INDEXER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Batch records from a file or stdin into a writer
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display per-sensor writer settings
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "indexing.toml",
        env = "BULK_INDEXER_CONFIG"
    )]
    pub config: PathBuf,

    /// NDJSON input file, `-` for stdin
    #[arg(short, long, default_value = "-", env = "BULK_INDEXER_INPUT")]
    pub input: String,

    /// Writer receiving the batches
    #[arg(
        short,
        long,
        value_enum,
        default_value = "log",
        env = "BULK_INDEXER_WRITER"
    )]
    pub writer: WriterKind,

    /// Elasticsearch base URL
    #[arg(long, default_value = "http://localhost:9200", env = "ELASTICSEARCH_URL")]
    pub es_url: String,

    /// Elasticsearch username
    #[arg(long, env = "ELASTICSEARCH_USERNAME")]
    pub es_username: Option<String>,

    /// Elasticsearch password
    #[arg(long, env = "ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    pub es_password: Option<String>,

    /// Elasticsearch request timeout in seconds
    #[arg(long, default_value = "30", env = "ELASTICSEARCH_TIMEOUT")]
    pub es_timeout: u64,

    /// Output directory of the file writer
    #[arg(long, default_value = "./output", env = "BULK_INDEXER_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Tick interval override in seconds (0 = derive from configuration)
    #[arg(long, default_value = "0", env = "BULK_INDEXER_TICK_INTERVAL")]
    pub tick_interval: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BULK_INDEXER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without reading input
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "indexing.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "indexing.toml")]
    pub config: PathBuf,

    /// Writer whose settings are shown
    #[arg(short, long, value_enum, default_value = "elasticsearch")]
    pub writer: WriterKind,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Writer backends
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterKind {
    /// Elasticsearch `_bulk` API
    Elasticsearch,
    /// NDJSON files, one per destination
    File,
    /// Log every batch, write nothing
    Log,
}

impl WriterKind {
    /// Writer name used for configuration lookup
    pub fn name(self) -> &'static str {
        match self {
            Self::Elasticsearch => elasticsearch::WRITER_NAME,
            Self::File => "file",
            Self::Log => "log",
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::parse_from([
            "bulk-indexer",
            "run",
            "--config",
            "conf.toml",
            "--writer",
            "file",
            "--input",
            "events.ndjson",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.writer, WriterKind::File);
                assert_eq!(args.input, "events.ndjson");
                assert_eq!(args.config, PathBuf::from("conf.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_writer_names() {
        assert_eq!(WriterKind::Elasticsearch.name(), "elasticsearch");
        assert_eq!(WriterKind::File.name(), "file");
    }
}
