//! Config parsing
//!
//! TOML is the primary format; JSON is also accepted.

use contracts::{ContractError, IndexingConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (preferred)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<IndexingConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<IndexingConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse content in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<IndexingConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_defaults() {
        let config = parse_toml("[sensors.yaf.elasticsearch]\n").unwrap();
        let yaf = &config.sensors["yaf"]["elasticsearch"];
        assert_eq!(yaf.batch_size, 1);
        assert_eq!(yaf.batch_timeout, 0);
        assert!(yaf.enabled);
        assert_eq!(config.global.message_timeout_secs, 30);
        assert_eq!(config.global.batch_timeout_divisor, 1);
    }

    #[test]
    fn test_parse_json_multiple_writers() {
        let content = r#"{
            "sensors": {
                "bro": {
                    "elasticsearch": { "index": "bro", "batch_size": 5 },
                    "file": { "batch_size": 500, "batch_timeout": 10 }
                }
            }
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.sensors["bro"].len(), 2);
        assert_eq!(config.sensors["bro"]["file"].batch_timeout, 10);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
