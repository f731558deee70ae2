//! Loading `AuthConfig` from JSON documents and the process environment.
//!
//! # Design
//! - Environment lookups go through a closure so tests never mutate process state.
//! - Every loader validates before returning.

use std::path::Path;

use tracing::{debug, info};

use crate::defaults::{
    ENV_AUTH_TIMEOUT_MS, ENV_COMMAND_BUFFER, ENV_LOG_LEVEL, ENV_PARTNER_NAME,
    ENV_PARTNER_PASSWORD, ENV_SESSION_EXPIRED_CODE,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::AuthConfig;
use crate::validate::parse_optional;

impl AuthConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input, or a validation error.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(document).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// same errors as [`AuthConfig::from_json_str`].
    pub async fn load_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let document = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                operation: "config.read",
                source,
            })?;
        let config = Self::from_json_str(&document)?;
        info!(path = %path.display(), "loaded authentication config");
        Ok(config)
    }

    /// Build from `EXPENSA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is absent or a value is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup using the `EXPENSA_*` names.
    ///
    /// # Errors
    ///
    /// Returns an error when a required key is absent or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let partner_name = lookup(ENV_PARTNER_NAME).ok_or(ConfigError::MissingField {
            field: "partner_name",
        })?;
        let partner_password = lookup(ENV_PARTNER_PASSWORD).ok_or(ConfigError::MissingField {
            field: "partner_password",
        })?;

        let mut config = Self::new(partner_name, partner_password);
        if let Some(code) = parse_optional("session_expired_code", lookup(ENV_SESSION_EXPIRED_CODE))?
        {
            config.session_expired_code = code;
        }
        config.cycle_timeout_ms = parse_optional("cycle_timeout_ms", lookup(ENV_AUTH_TIMEOUT_MS))?;
        if let Some(buffer) = parse_optional("command_buffer", lookup(ENV_COMMAND_BUFFER))? {
            config.command_buffer = buffer;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        config.validate()?;
        debug!(
            partner_name = %config.partner_name,
            timeout_ms = ?config.cycle_timeout_ms,
            "resolved authentication config from environment"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn from_lookup_reads_all_keys() -> anyhow::Result<()> {
        let config = AuthConfig::from_lookup(lookup(&[
            (ENV_PARTNER_NAME, "expensify.com"),
            (ENV_PARTNER_PASSWORD, "pw"),
            (ENV_SESSION_EXPIRED_CODE, "408"),
            (ENV_AUTH_TIMEOUT_MS, "2500"),
            (ENV_COMMAND_BUFFER, "8"),
            (ENV_LOG_LEVEL, "debug"),
        ]))?;
        assert_eq!(config.session_expired_code, 408);
        assert_eq!(config.cycle_timeout_ms, Some(2_500));
        assert_eq!(config.command_buffer, 8);
        assert_eq!(config.log_level, "debug");
        Ok(())
    }

    #[test]
    fn from_lookup_requires_partner_credentials() {
        let err = AuthConfig::from_lookup(lookup(&[(ENV_PARTNER_NAME, "expensify.com")]));
        assert!(matches!(
            err,
            Err(ConfigError::MissingField {
                field: "partner_password"
            })
        ));
    }

    #[test]
    fn from_lookup_rejects_non_numeric_values() {
        let err = AuthConfig::from_lookup(lookup(&[
            (ENV_PARTNER_NAME, "expensify.com"),
            (ENV_PARTNER_PASSWORD, "pw"),
            (ENV_COMMAND_BUFFER, "lots"),
        ]));
        assert!(matches!(
            err,
            Err(ConfigError::InvalidField {
                field: "command_buffer",
                ..
            })
        ));
    }

    #[test]
    fn from_json_str_reports_parse_and_validation_errors() {
        assert!(matches!(
            AuthConfig::from_json_str("{not json"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            AuthConfig::from_json_str(r#"{"partner_name": "", "partner_password": "pw"}"#),
            Err(ConfigError::InvalidField { .. })
        ));
    }
}
