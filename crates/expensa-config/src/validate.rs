//! Validation helpers and parsing utilities for configuration values.

use std::str::FromStr;

use crate::defaults::SUCCESS_CODE;
use crate::error::{ConfigError, ConfigResult};

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn ensure_non_blank(field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, value, "must not be blank"));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn ensure_positive<T>(field: &'static str, value: T) -> ConfigResult<()>
where
    T: Default + PartialOrd + ToString,
{
    if value <= T::default() {
        return Err(ConfigError::invalid(field, value, "must be positive"));
    }
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn ensure_session_expired_code(code: i64) -> ConfigResult<()> {
    if code == SUCCESS_CODE {
        return Err(ConfigError::invalid(
            "session_expired_code",
            code,
            "must differ from the success code",
        ));
    }
    Ok(())
}

/// Parse an optional raw string into `T`, trimming whitespace.
#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_optional<T: FromStr>(
    field: &'static str,
    raw: Option<String>,
) -> ConfigResult<Option<T>> {
    raw.map(|value| {
        let parsed = value.trim().parse::<T>();
        parsed.map_err(|_| ConfigError::invalid(field, value, "must be a number"))
    })
    .transpose()
}
