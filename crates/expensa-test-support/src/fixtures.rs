//! Credential and configuration fixtures.

use std::time::Duration;

use expensa_auth_core::{AuthenticateParams, CommandParams, Credentials};
use expensa_config::GateConfig;
use serde_json::Value;

/// Partner name used across fixtures.
pub const PARTNER_NAME: &str = "expensify.com";
/// Partner password used across fixtures.
pub const PARTNER_PASSWORD: &str = "partner-password";
/// Login identifier of the fixture user.
pub const LOGIN: &str = "auto-generated-login";
/// Partner user secret of the fixture user.
pub const SECRET: &str = "auto-generated-secret";

/// Stored credentials for the fixture user.
#[must_use]
pub fn credentials() -> Credentials {
    Credentials::new(LOGIN, SECRET)
}

/// Gate configuration with the fixture partner and no cycle bound.
#[must_use]
pub fn gate_config() -> GateConfig {
    GateConfig::new(PARTNER_NAME, PARTNER_PASSWORD).with_command_buffer(16)
}

/// Gate configuration whose cycles are bounded by `timeout`.
#[must_use]
pub fn gate_config_with_timeout(timeout: Duration) -> GateConfig {
    gate_config().with_cycle_timeout(timeout)
}

/// Complete first sign-in parameters for the fixture user.
#[must_use]
pub fn sign_in_params() -> AuthenticateParams {
    AuthenticateParams {
        use_expensify_login: Some(true),
        partner_name: Some(PARTNER_NAME.into()),
        partner_password: Some(PARTNER_PASSWORD.into()),
        partner_user_id: Some("user@example.com".into()),
        partner_user_secret: Some("hunter2".into()),
        email: Some("user@example.com".into()),
        ..AuthenticateParams::default()
    }
}

/// Command parameters built from string pairs.
#[must_use]
pub fn params(pairs: &[(&str, &str)]) -> CommandParams {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), Value::String((*value).to_string())))
        .collect()
}
