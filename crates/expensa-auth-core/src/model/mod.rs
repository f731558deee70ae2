//! Credential, session and wire DTOs exchanged with the remote API.

use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RequestError;

/// Parameters attached to a named command.
pub type CommandParams = Map<String, Value>;

/// Command that exchanges stored credentials for a fresh session token.
pub const AUTHENTICATE_COMMAND: &str = "Authenticate";

/// Parameter carrying the session token on every outbound command.
pub const PARAM_AUTH_TOKEN: &str = "authToken";

/// Parameter that lets a command skip the request gate.
pub const PARAM_FORCE_NETWORK_REQUEST: &str = "forceNetworkRequest";

/// Parameter that disables transport-level retries for a command.
pub const PARAM_SHOULD_RETRY: &str = "shouldRetry";

/// `jsonCode` values the coordinator interprets.
///
/// This is the only place the sentinel for unreachable backends is defined.
pub mod json_code {
    /// Command completed successfully.
    pub const SUCCESS: i64 = 200;
    /// The session token attached to the command is expired or unknown.
    pub const NOT_AUTHENTICATED: i64 = 407;
    /// Synthesised by the transport when the backend could not be reached.
    pub const UNABLE_TO_RETRY: i64 = -1;
}

/// Partner identity used to mint new session tokens.
///
/// Replaced wholesale on a fresh login; never partially updated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login identifier (partner user id).
    pub login: String,
    /// Partner user secret paired with `login`.
    pub secret: String,
}

impl Credentials {
    /// Build a credential pair.
    #[must_use]
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Current session tokens; `None` means there is no valid session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Token attached to outbound commands.
    pub auth_token: Option<String>,
    /// Encrypted token variant used by attachment/image requests.
    pub encrypted_auth_token: Option<String>,
}

impl Session {
    /// Session carrying the supplied tokens.
    #[must_use]
    pub const fn new(auth_token: Option<String>, encrypted_auth_token: Option<String>) -> Self {
        Self {
            auth_token,
            encrypted_auth_token,
        }
    }

    /// Whether the session holds a usable auth token.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.auth_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }
}

/// Outcome of an Authenticate response, derived from its `jsonCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// New tokens were issued.
    Success,
    /// The backend could not be reached; the user may simply be offline.
    Offline,
    /// The backend rejected the stored credentials.
    Rejected,
}

/// Structured response returned by the command transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Authoritative outcome discriminator.
    pub json_code: i64,
    /// Fresh session token (Authenticate only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Fresh encrypted session token (Authenticate only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_auth_token: Option<String>,
    /// Backend-provided detail for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Remaining command-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    /// Response carrying only a `jsonCode`.
    #[must_use]
    pub fn with_code(json_code: i64) -> Self {
        Self {
            json_code,
            ..Self::default()
        }
    }

    /// Successful Authenticate response carrying the issued tokens.
    #[must_use]
    pub fn authenticated(auth_token: impl Into<String>, encrypted_auth_token: Option<String>) -> Self {
        Self {
            json_code: json_code::SUCCESS,
            auth_token: Some(auth_token.into()),
            encrypted_auth_token,
            ..Self::default()
        }
    }

    /// Attach a backend message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether the command succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.json_code == json_code::SUCCESS
    }

    /// Classify this response as an Authenticate outcome.
    #[must_use]
    pub const fn auth_outcome(&self) -> AuthOutcome {
        match self.json_code {
            json_code::SUCCESS => AuthOutcome::Success,
            json_code::UNABLE_TO_RETRY => AuthOutcome::Offline,
            _ => AuthOutcome::Rejected,
        }
    }
}

/// Caller-supplied inputs for the Authenticate command.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthenticateParams {
    /// Check credentials against the first-party partner (initial sign-in only).
    pub use_expensify_login: Option<bool>,
    /// Partner application name.
    pub partner_name: Option<String>,
    /// Partner application password.
    pub partner_password: Option<String>,
    /// Partner user id (login identifier).
    pub partner_user_id: Option<String>,
    /// Partner user secret.
    pub partner_user_secret: Option<String>,
    /// Two-factor code, when the account requires one.
    pub two_factor_auth_code: Option<String>,
    /// Existing token, if any.
    pub auth_token: Option<String>,
    /// Email of the signing-in user.
    pub email: Option<String>,
}

impl Debug for AuthenticateParams {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthenticateParams")
            .field("use_expensify_login", &self.use_expensify_login)
            .field("partner_name", &self.partner_name)
            .field("partner_user_id", &self.partner_user_id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Validated Authenticate wire request.
///
/// `shouldRetry` is always `false` and `forceNetworkRequest` always `true`:
/// retry policy belongs to the coordinator, and the request must never wait
/// behind the gate it is trying to unblock.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticateRequest {
    use_expensify_login: Option<bool>,
    partner_name: String,
    partner_password: String,
    partner_user_id: String,
    partner_user_secret: String,
    two_factor_auth_code: Option<String>,
    auth_token: Option<String>,
    email: Option<String>,
}

impl AuthenticateRequest {
    /// Validate the supplied parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MissingParameter`] when a required parameter is
    /// absent or blank.
    pub fn new(params: AuthenticateParams) -> Result<Self, RequestError> {
        let AuthenticateParams {
            use_expensify_login,
            partner_name,
            partner_password,
            partner_user_id,
            partner_user_secret,
            two_factor_auth_code,
            auth_token,
            email,
        } = params;

        Ok(Self {
            use_expensify_login,
            partner_name: require("partnerName", partner_name)?,
            partner_password: require("partnerPassword", partner_password)?,
            partner_user_id: require("partnerUserID", partner_user_id)?,
            partner_user_secret: require("partnerUserSecret", partner_user_secret)?,
            two_factor_auth_code,
            auth_token,
            email,
        })
    }

    /// Partner user id this request authenticates.
    #[must_use]
    pub fn partner_user_id(&self) -> &str {
        &self.partner_user_id
    }

    /// Encode the request as command parameters; absent optionals are omitted.
    #[must_use]
    pub fn into_params(self) -> CommandParams {
        let mut params = CommandParams::new();
        if let Some(flag) = self.use_expensify_login {
            params.insert("useExpensifyLogin".into(), Value::Bool(flag));
        }
        params.insert("partnerName".into(), Value::String(self.partner_name));
        params.insert("partnerPassword".into(), Value::String(self.partner_password));
        params.insert("partnerUserID".into(), Value::String(self.partner_user_id));
        params.insert(
            "partnerUserSecret".into(),
            Value::String(self.partner_user_secret),
        );
        if let Some(code) = self.two_factor_auth_code {
            params.insert("twoFactorAuthCode".into(), Value::String(code));
        }
        if let Some(token) = self.auth_token {
            params.insert(PARAM_AUTH_TOKEN.into(), Value::String(token));
        }
        params.insert(PARAM_SHOULD_RETRY.into(), Value::Bool(false));
        params.insert(PARAM_FORCE_NETWORK_REQUEST.into(), Value::Bool(true));
        if let Some(email) = self.email {
            params.insert("email".into(), Value::String(email));
        }
        params
    }
}

impl Debug for AuthenticateRequest {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthenticateRequest")
            .field("partner_name", &self.partner_name)
            .field("partner_user_id", &self.partner_user_id)
            .field("use_expensify_login", &self.use_expensify_login)
            .finish_non_exhaustive()
    }
}

fn require(parameter: &'static str, value: Option<String>) -> Result<String, RequestError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RequestError::MissingParameter {
            command: AUTHENTICATE_COMMAND,
            parameter,
        }),
    }
}

/// Whether the parameters ask to bypass the request gate.
#[must_use]
pub fn forces_network_request(params: &CommandParams) -> bool {
    params
        .get(PARAM_FORCE_NETWORK_REQUEST)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
