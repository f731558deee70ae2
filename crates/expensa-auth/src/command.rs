#![allow(clippy::redundant_pub_crate)]

use expensa_auth_core::{AuthError, AuthResult, CommandParams};
use tokio::sync::oneshot;

/// Messages accepted by the gate worker.
#[derive(Debug)]
pub(crate) enum GateCommand {
    /// Ask to dispatch a request; answered immediately when idle, otherwise
    /// parked until the in-flight cycle resolves.
    Admit {
        /// The parked unit of work.
        pending: PendingRequest,
    },
    /// Start a cycle, or join the one already in flight.
    Reauthenticate {
        /// Command that observed the expired session.
        origin: Option<String>,
        /// Receives the cycle's shared outcome.
        respond_to: oneshot::Sender<AuthResult<()>>,
    },
}

/// A request owned by the gate until it is released.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub(crate) command: String,
    pub(crate) params: CommandParams,
    respond_to: oneshot::Sender<Release>,
}

/// How a pending request leaves the gate.
#[derive(Debug)]
pub(crate) enum Release {
    /// Dispatch now, reading the session at send time.
    Proceed {
        command: String,
        params: CommandParams,
    },
    /// Never dispatched; the cycle failed with this error.
    Abandon(AuthError),
}

impl PendingRequest {
    pub(crate) fn new(
        command: String,
        params: CommandParams,
    ) -> (Self, oneshot::Receiver<Release>) {
        let (respond_to, receiver) = oneshot::channel();
        (
            Self {
                command,
                params,
                respond_to,
            },
            receiver,
        )
    }

    /// Hand the request back to its caller; `false` if the caller went away.
    pub(crate) fn proceed(self) -> bool {
        let Self {
            command,
            params,
            respond_to,
        } = self;
        respond_to.send(Release::Proceed { command, params }).is_ok()
    }

    /// Drop the request with `error`; `false` if the caller went away.
    pub(crate) fn abandon(self, error: AuthError) -> bool {
        self.respond_to.send(Release::Abandon(error)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn proceed_returns_command_and_params() {
        let mut params = CommandParams::new();
        params.insert("reportID".into(), "42".into());
        let (pending, receiver) = PendingRequest::new("OpenReport".into(), params.clone());
        assert!(pending.proceed());
        match receiver.await {
            Ok(Release::Proceed {
                command,
                params: released,
            }) => {
                assert_eq!(command, "OpenReport");
                assert_eq!(released, params);
            }
            other => panic!("unexpected release: {other:?}"),
        }
    }

    #[test]
    fn abandon_reports_departed_caller() {
        let (pending, receiver) = PendingRequest::new("OpenReport".into(), CommandParams::new());
        drop(receiver);
        assert!(!pending.abandon(AuthError::terminal("locked")));
    }
}
