//! Config validation
//!
//! Rules:
//! - 2 <= message_timeout_secs <= MAX_MESSAGE_TIMEOUT_SECS (the default batch timeout is half of it)
//! - batch_timeout_divisor >= 1
//! - date_format is not empty
//! - writer names are not empty
//! - batch_size >= 1
//! - index, when set, is not empty

use contracts::{ContractError, IndexingConfig, MAX_MESSAGE_TIMEOUT_SECS};

/// Validate an `IndexingConfig`
///
/// Returns the first error found.
pub fn validate(config: &IndexingConfig) -> Result<(), ContractError> {
    validate_global(config)?;
    validate_sensors(config)?;
    Ok(())
}

fn validate_global(config: &IndexingConfig) -> Result<(), ContractError> {
    let global = &config.global;

    if global.message_timeout_secs < 2 {
        return Err(ContractError::config_validation(
            "global.message_timeout_secs",
            format!(
                "message_timeout_secs must be >= 2, got {}",
                global.message_timeout_secs
            ),
        ));
    }

    if global.message_timeout_secs > MAX_MESSAGE_TIMEOUT_SECS {
        return Err(ContractError::config_validation(
            "global.message_timeout_secs",
            format!(
                "message_timeout_secs must be <= {}, got {}",
                MAX_MESSAGE_TIMEOUT_SECS, global.message_timeout_secs
            ),
        ));
    }

    if global.batch_timeout_divisor == 0 {
        return Err(ContractError::config_validation(
            "global.batch_timeout_divisor",
            "batch_timeout_divisor must be >= 1",
        ));
    }

    if global.date_format.trim().is_empty() {
        return Err(ContractError::config_validation(
            "global.date_format",
            "date_format cannot be empty",
        ));
    }

    if let Some(field) = &global.document_id_field {
        if field.trim().is_empty() {
            return Err(ContractError::config_validation(
                "global.document_id_field",
                "document_id_field cannot be empty when set",
            ));
        }
    }

    Ok(())
}

fn validate_sensors(config: &IndexingConfig) -> Result<(), ContractError> {
    for (sensor, writers) in &config.sensors {
        for (writer, settings) in writers {
            if writer.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("sensors.{sensor}"),
                    "writer name cannot be empty",
                ));
            }

            if settings.batch_size == 0 {
                return Err(ContractError::config_validation(
                    format!("sensors.{sensor}.{writer}.batch_size"),
                    "batch_size must be >= 1",
                ));
            }

            if let Some(index) = &settings.index {
                if index.trim().is_empty() {
                    return Err(ContractError::config_validation(
                        format!("sensors.{sensor}.{writer}.index"),
                        "index cannot be empty when set",
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GlobalConfig, SensorWriterConfig};
    use std::collections::BTreeMap;

    fn minimal_config() -> IndexingConfig {
        IndexingConfig {
            global: GlobalConfig::default(),
            sensors: BTreeMap::from([(
                "bro".to_string(),
                BTreeMap::from([(
                    "elasticsearch".to_string(),
                    SensorWriterConfig {
                        index: Some("bro".into()),
                        batch_size: 10,
                        batch_timeout: 2,
                        enabled: true,
                    },
                )]),
            )]),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(validate(&IndexingConfig::default()).is_ok());
    }

    #[test]
    fn test_message_timeout_too_small() {
        let mut config = minimal_config();
        config.global.message_timeout_secs = 1;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("global.message_timeout_secs"), "got: {err}");
    }

    #[test]
    fn test_message_timeout_too_large() {
        let mut config = minimal_config();
        config.global.message_timeout_secs = MAX_MESSAGE_TIMEOUT_SECS;
        assert!(validate(&config).is_ok());

        config.global.message_timeout_secs = u64::MAX;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("must be <= 86400"), "got: {err}");
    }

    #[test]
    fn test_zero_divisor() {
        let mut config = minimal_config();
        config.global.batch_timeout_divisor = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = minimal_config();
        if let Some(settings) = config
            .sensors
            .get_mut("bro")
            .and_then(|w| w.get_mut("elasticsearch"))
        {
            settings.batch_size = 0;
        }
        let err = validate(&config).unwrap_err().to_string();
        assert!(
            err.contains("sensors.bro.elasticsearch.batch_size"),
            "got: {err}"
        );
    }

    #[test]
    fn test_blank_index() {
        let mut config = minimal_config();
        if let Some(settings) = config
            .sensors
            .get_mut("bro")
            .and_then(|w| w.get_mut("elasticsearch"))
        {
            settings.index = Some("  ".into());
        }
        assert!(validate(&config).is_err());
    }
}
