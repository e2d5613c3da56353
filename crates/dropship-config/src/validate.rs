//! Validation helpers and parsing utilities for environment values.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Parse a whole number of seconds into a [`Duration`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the value is not a
/// non-negative integer.
pub fn parse_seconds(name: &'static str, value: &str) -> ConfigResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidValue {
            name,
            reason: "must be a whole number of seconds",
            value: value.to_string(),
        })
}

/// Parse a per-file attempt budget; zero attempts would silently skip every
/// file and is rejected.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when the value is not a positive
/// integer.
pub fn parse_attempts(name: &'static str, value: &str) -> ConfigResult<u32> {
    let attempts = value
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            reason: "must be a positive integer",
            value: value.to_string(),
        })?;
    if attempts == 0 {
        return Err(ConfigError::InvalidValue {
            name,
            reason: "must be a positive integer",
            value: value.to_string(),
        });
    }
    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_accepts_whole_numbers() -> anyhow::Result<()> {
        assert_eq!(parse_seconds("STABLE_SECONDS", "3")?, Duration::from_secs(3));
        assert_eq!(parse_seconds("STABLE_SECONDS", " 0 ")?, Duration::ZERO);
        Ok(())
    }

    #[test]
    fn parse_seconds_rejects_non_integers() {
        let err = parse_seconds("POLL_INTERVAL", "1.5").expect_err("fractional seconds");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "POLL_INTERVAL",
                ..
            }
        ));
    }

    #[test]
    fn parse_attempts_rejects_zero() {
        let err = parse_attempts("RETRY_COUNT", "0").expect_err("zero attempts");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "RETRY_COUNT",
                reason: "must be a positive integer",
                ..
            }
        ));
    }
}
