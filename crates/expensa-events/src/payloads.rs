//! Authentication lifecycle events carried on the bus.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Typed authentication events surfaced to observers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A re-authentication cycle began and the gate started holding requests.
    AuthenticationStarted {
        /// Identifier of the cycle.
        cycle_id: Uuid,
        /// Command whose response triggered the cycle.
        origin: Option<String>,
    },
    /// The cycle succeeded and the session store holds fresh tokens.
    SessionRefreshed {
        /// Identifier of the cycle.
        cycle_id: Uuid,
    },
    /// The cycle could not reach the backend; the user stays signed in.
    AuthenticationDeferred {
        /// Identifier of the cycle.
        cycle_id: Uuid,
        /// Loggable failure reason.
        reason: String,
    },
    /// Credentials were rejected and the user was sent to sign-in.
    SignInRequired {
        /// Identifier of the cycle.
        cycle_id: Uuid,
        /// Classified reason displayed to the user.
        reason: String,
    },
    /// The cycle could not be attempted because inputs were missing.
    AuthenticationMisconfigured {
        /// Identifier of the cycle.
        cycle_id: Uuid,
        /// Precondition that failed.
        detail: String,
    },
    /// Requests held during a cycle were released.
    RequestsReleased {
        /// Identifier of the cycle.
        cycle_id: Uuid,
        /// Requests allowed to proceed with the refreshed session.
        replayed: usize,
        /// Requests abandoned because the cycle failed.
        abandoned: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for subscribers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationStarted { .. } => "authentication_started",
            Self::SessionRefreshed { .. } => "session_refreshed",
            Self::AuthenticationDeferred { .. } => "authentication_deferred",
            Self::SignInRequired { .. } => "sign_in_required",
            Self::AuthenticationMisconfigured { .. } => "authentication_misconfigured",
            Self::RequestsReleased { .. } => "requests_released",
        }
    }

    /// Cycle the event belongs to.
    #[must_use]
    pub const fn cycle_id(&self) -> Uuid {
        match self {
            Self::AuthenticationStarted { cycle_id, .. }
            | Self::SessionRefreshed { cycle_id }
            | Self::AuthenticationDeferred { cycle_id, .. }
            | Self::SignInRequired { cycle_id, .. }
            | Self::AuthenticationMisconfigured { cycle_id, .. }
            | Self::RequestsReleased { cycle_id, .. } => *cycle_id,
        }
    }
}

/// Metadata wrapper around events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
