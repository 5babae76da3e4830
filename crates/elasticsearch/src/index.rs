//! Time-partitioned index naming
//!
//! Documents of sensor `bro` go to `bro_index_<postfix>`, where the postfix is
//! the current time rendered with the configured date format.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use contracts::ContractError;

/// Check a chrono strftime format before using it.
pub fn validate_date_format(format: &str) -> Result<(), ContractError> {
    if format.trim().is_empty() {
        return Err(ContractError::config_validation(
            "global.date_format",
            "date_format cannot be empty",
        ));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ContractError::config_validation(
            "global.date_format",
            format!("invalid date format '{format}'"),
        ));
    }
    Ok(())
}

/// Render `now` with `format`.
pub fn index_postfix(format: &str, now: DateTime<Utc>) -> Result<String, ContractError> {
    validate_date_format(format)?;
    Ok(now.format(format).to_string())
}

/// `{index}_index_{postfix}`
pub fn index_name(index: &str, postfix: &str) -> String {
    format!("{index}_index_{postfix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 0).unwrap();
        let postfix = index_postfix(contracts::DEFAULT_DATE_FORMAT, now).unwrap();
        assert_eq!(postfix, "2024.03.09.17");
        assert_eq!(index_name("bro", &postfix), "bro_index_2024.03.09.17");
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(validate_date_format("%Y.%Q").is_err());
        assert!(validate_date_format("  ").is_err());
        assert!(validate_date_format("%Y-%m-%d").is_ok());
    }
}
