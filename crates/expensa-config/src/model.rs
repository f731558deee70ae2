//! Typed configuration for the authentication coordinator and request gate.
//!
//! # Design
//! - `AuthConfig` is the persisted/deserialised shape; `GateConfig` is the
//!   validated runtime view handed to the gate.
//! - Optional knobs fall back to defaults at deserialisation time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigResult;
use crate::validate;

/// Authentication settings as loaded from JSON or the environment.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Partner name sent with every Authenticate request.
    pub partner_name: String,
    /// Partner password sent with every Authenticate request.
    pub partner_password: String,
    /// Json code that signals an expired session.
    #[serde(default = "default_session_expired_code")]
    pub session_expired_code: i64,
    /// Upper bound for a single re-authentication cycle in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_timeout_ms: Option<u64>,
    /// Depth of the gate's command channel.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Log level applied when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AuthConfig {
    /// Build a configuration with default knobs for the given partner.
    #[must_use]
    pub fn new(partner_name: impl Into<String>, partner_password: impl Into<String>) -> Self {
        Self {
            partner_name: partner_name.into(),
            partner_password: partner_password.into(),
            session_expired_code: defaults::SESSION_EXPIRED_CODE,
            cycle_timeout_ms: None,
            command_buffer: defaults::COMMAND_BUFFER,
            log_level: defaults::LOG_LEVEL.to_string(),
        }
    }

    /// Check every field against its constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`crate::ConfigError`] encountered.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::ensure_non_blank("partner_name", &self.partner_name)?;
        validate::ensure_non_blank("partner_password", &self.partner_password)?;
        validate::ensure_session_expired_code(self.session_expired_code)?;
        validate::ensure_positive("command_buffer", self.command_buffer)?;
        if let Some(timeout) = self.cycle_timeout_ms {
            validate::ensure_positive("cycle_timeout_ms", timeout)?;
        }
        validate::ensure_non_blank("log_level", &self.log_level)
    }

    /// Validate and convert into the runtime gate configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ConfigError`] when validation fails.
    pub fn gate_config(&self) -> ConfigResult<GateConfig> {
        self.validate()?;
        Ok(GateConfig {
            partner_name: self.partner_name.clone(),
            partner_password: self.partner_password.clone(),
            session_expired_code: self.session_expired_code,
            cycle_timeout: self.cycle_timeout_ms.map(Duration::from_millis),
            command_buffer: self.command_buffer,
        })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("partner_name", &self.partner_name)
            .field("partner_password", &"<redacted>")
            .field("session_expired_code", &self.session_expired_code)
            .field("cycle_timeout_ms", &self.cycle_timeout_ms)
            .field("command_buffer", &self.command_buffer)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Runtime configuration consumed by the request gate.
#[derive(Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Partner name sent with every Authenticate request.
    pub partner_name: String,
    /// Partner password sent with every Authenticate request.
    pub partner_password: String,
    /// Json code that signals an expired session.
    pub session_expired_code: i64,
    /// Bound applied to a single cycle; `None` defers to the transport.
    pub cycle_timeout: Option<Duration>,
    /// Depth of the gate's command channel.
    pub command_buffer: usize,
}

impl GateConfig {
    /// Gate configuration with default knobs for the given partner.
    #[must_use]
    pub fn new(partner_name: impl Into<String>, partner_password: impl Into<String>) -> Self {
        Self {
            partner_name: partner_name.into(),
            partner_password: partner_password.into(),
            session_expired_code: defaults::SESSION_EXPIRED_CODE,
            cycle_timeout: None,
            command_buffer: defaults::COMMAND_BUFFER,
        }
    }

    /// Bound each cycle by `timeout`.
    #[must_use]
    pub const fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_timeout = Some(timeout);
        self
    }

    /// Override the command channel depth.
    #[must_use]
    pub const fn with_command_buffer(mut self, command_buffer: usize) -> Self {
        self.command_buffer = command_buffer;
        self
    }
}

impl std::fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateConfig")
            .field("partner_name", &self.partner_name)
            .field("partner_password", &"<redacted>")
            .field("session_expired_code", &self.session_expired_code)
            .field("cycle_timeout", &self.cycle_timeout)
            .field("command_buffer", &self.command_buffer)
            .finish()
    }
}

const fn default_session_expired_code() -> i64 {
    defaults::SESSION_EXPIRED_CODE
}

const fn default_command_buffer() -> usize {
    defaults::COMMAND_BUFFER
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}
