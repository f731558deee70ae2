//! Default values and environment keys for the authentication configuration.

/// Json code that marks a response as "session expired".
pub(crate) const SESSION_EXPIRED_CODE: i64 = 407;
/// Json code reserved for successful responses.
pub(crate) const SUCCESS_CODE: i64 = 200;
/// Depth of the gate's command channel.
pub(crate) const COMMAND_BUFFER: usize = 64;
/// Log level applied when none is configured.
pub(crate) const LOG_LEVEL: &str = "info";

/// Environment variable carrying the partner name.
pub const ENV_PARTNER_NAME: &str = "EXPENSA_PARTNER_NAME";
/// Environment variable carrying the partner password.
pub const ENV_PARTNER_PASSWORD: &str = "EXPENSA_PARTNER_PASSWORD";
/// Environment variable overriding the session-expired json code.
pub const ENV_SESSION_EXPIRED_CODE: &str = "EXPENSA_SESSION_EXPIRED_CODE";
/// Environment variable bounding a single re-authentication cycle (ms).
pub const ENV_AUTH_TIMEOUT_MS: &str = "EXPENSA_AUTH_TIMEOUT_MS";
/// Environment variable sizing the gate command channel.
pub const ENV_COMMAND_BUFFER: &str = "EXPENSA_COMMAND_BUFFER";
/// Environment variable selecting the log level.
pub const ENV_LOG_LEVEL: &str = "EXPENSA_LOG_LEVEL";
