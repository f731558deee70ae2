//! Session-expiry handling for ordinary commands.

use expensa_auth_core::{CommandParams, DispatchResult, Response};
use tracing::info;

use crate::gate::AuthGate;

/// Dispatches through an [`AuthGate`] and recovers from expired sessions.
///
/// A response carrying the gate's session-expired code triggers one
/// re-authentication and exactly one replay of the same command.
#[derive(Clone)]
pub struct ReauthenticatingClient {
    gate: AuthGate,
}

impl ReauthenticatingClient {
    /// Wrap `gate`.
    #[must_use]
    pub const fn new(gate: AuthGate) -> Self {
        Self { gate }
    }

    /// The wrapped gate.
    #[must_use]
    pub const fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Dispatch `command`, re-authenticating and replaying once on expiry.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error of either attempt, or
    /// [`expensa_auth_core::DispatchError::Auth`] when re-authentication fails.
    pub async fn call(&self, command: &str, params: CommandParams) -> DispatchResult<Response> {
        let response = self.gate.dispatch(command, params.clone()).await?;
        if response.json_code != self.gate.session_expired_code() {
            return Ok(response);
        }

        info!(command, "session expired; re-authenticating before replay");
        self.gate.reauthenticate(Some(command)).await?;
        self.gate.dispatch(command, params).await
    }
}
