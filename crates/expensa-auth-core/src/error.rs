//! Error taxonomy for authentication and gated dispatch.

use thiserror::Error;

/// Precondition violation raised before any network call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A required command parameter was absent or blank.
    #[error("{command} called without required parameter {parameter}")]
    MissingParameter {
        /// Command being built.
        command: &'static str,
        /// Wire name of the missing parameter.
        parameter: &'static str,
    },
}

/// Failure reported by the command transport itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend could not be reached.
    #[error("command could not reach the server")]
    Unreachable {
        /// Command that failed.
        command: String,
        /// Transport-provided detail.
        detail: String,
    },
    /// The transport gave up waiting for a response.
    #[error("command timed out")]
    Timeout {
        /// Command that timed out.
        command: String,
    },
    /// The transport has shut down.
    #[error("command transport closed")]
    Closed,
}

/// Result of a re-authentication cycle shared by every caller awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Connectivity-class failure; the user stays signed in.
    #[error("re-authentication could not reach the server")]
    Retryable {
        /// Loggable reason.
        reason: String,
    },
    /// Credentials were rejected; the user has been sent to sign-in.
    #[error("credentials rejected; sign-in required")]
    Terminal {
        /// Classified reason shown on the sign-in screen.
        reason: String,
    },
    /// Authenticate was invoked without its required inputs.
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
}

impl AuthError {
    /// Build a retryable error.
    #[must_use]
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
        }
    }

    /// Build a terminal error.
    #[must_use]
    pub fn terminal(reason: impl Into<String>) -> Self {
        Self::Terminal {
            reason: reason.into(),
        }
    }

    /// Whether the caller may try again later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }

    /// Whether the user has been signed out.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Reason attached to retryable/terminal outcomes.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Retryable { reason } | Self::Terminal { reason } => Some(reason),
            Self::InvalidRequest(_) => None,
        }
    }
}

/// Failure surfaced by a gated dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The request was held for a cycle that failed and was abandoned.
    #[error("request abandoned after failed re-authentication")]
    Auth(#[from] AuthError),
    /// The transport failed to deliver the command.
    #[error("command transport failed")]
    Transport(#[from] TransportError),
    /// The gate worker is no longer running.
    #[error("authentication gate is not running")]
    GateClosed,
}

/// Convenience alias for coordinator results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Convenience alias for gated dispatch results.
pub type DispatchResult<T> = Result<T, DispatchError>;
