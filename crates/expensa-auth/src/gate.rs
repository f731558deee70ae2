//! Cloneable handle to the request gate and its re-authentication worker.

use std::sync::Arc;

use expensa_auth_core::model::PARAM_AUTH_TOKEN;
use expensa_auth_core::{
    AuthError, AuthResult, AuthenticateParams, CommandParams, CommandTransport, DispatchError,
    DispatchResult, ErrorClassifier, Response, Session, SessionStore, SignInRedirector,
    forces_network_request,
};
use expensa_config::GateConfig;
use expensa_events::EventBus;
use expensa_telemetry::Metrics;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::classifier::DefaultErrorClassifier;
use crate::command::{GateCommand, PendingRequest, Release};
use crate::coordinator::Coordinator;
use crate::worker;

/// Collaborators the gate is wired to.
pub struct GateDependencies {
    /// Credential and session storage.
    pub store: Arc<dyn SessionStore>,
    /// Network transport for every command, Authenticate included.
    pub transport: Arc<dyn CommandTransport>,
    /// Turns rejected Authenticate responses into readable reasons.
    pub classifier: Arc<dyn ErrorClassifier>,
    /// Sends the user back to sign-in after a terminal failure.
    pub redirector: Arc<dyn SignInRedirector>,
    /// Bus receiving lifecycle events.
    pub events: EventBus,
    /// Optional metrics registry.
    pub metrics: Option<Metrics>,
}

impl GateDependencies {
    /// Wire the required collaborators with the default classifier, a fresh
    /// event bus and no metrics.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn CommandTransport>,
        redirector: Arc<dyn SignInRedirector>,
    ) -> Self {
        Self {
            store,
            transport,
            classifier: Arc::new(DefaultErrorClassifier),
            redirector,
            events: EventBus::new(),
            metrics: None,
        }
    }

    /// Replace the error classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Publish lifecycle events on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Record gate metrics in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Handle through which every outbound command passes.
///
/// Clones share one worker; the worker stops once every handle is dropped.
#[derive(Clone)]
pub struct AuthGate {
    commands: mpsc::Sender<GateCommand>,
    authenticating: watch::Receiver<bool>,
    coordinator: Arc<Coordinator>,
    session_expired_code: i64,
}

impl AuthGate {
    /// Start the gate worker.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    #[must_use]
    pub fn spawn(deps: GateDependencies, config: &GateConfig) -> Self {
        let GateDependencies {
            store,
            transport,
            classifier,
            redirector,
            events,
            metrics,
        } = deps;
        let coordinator = Arc::new(Coordinator::new(
            store, transport, classifier, redirector, config,
        ));
        let (commands, receiver) = mpsc::channel(config.command_buffer.max(1));
        let (flag, authenticating) = watch::channel(false);
        worker::spawn(Arc::clone(&coordinator), events, metrics, flag, receiver);

        Self {
            commands,
            authenticating,
            coordinator,
            session_expired_code: config.session_expired_code,
        }
    }

    /// Send `command` once the gate admits it.
    ///
    /// Requests marked `forceNetworkRequest` skip admission. Admitted requests
    /// carry the session token current at send time unless `params` already
    /// holds an `authToken`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Auth`] when the request was held behind a cycle
    /// that failed, [`DispatchError::Transport`] when sending failed, and
    /// [`DispatchError::GateClosed`] when the worker is gone.
    pub async fn dispatch(&self, command: &str, params: CommandParams) -> DispatchResult<Response> {
        if forces_network_request(&params) {
            debug!(command, "bypassing gate");
            return self.send(command, params).await;
        }

        let (pending, release) = PendingRequest::new(command.to_string(), params);
        self.commands
            .send(GateCommand::Admit { pending })
            .await
            .map_err(|_| DispatchError::GateClosed)?;
        match release.await.map_err(|_| DispatchError::GateClosed)? {
            Release::Proceed { command, params } => {
                let params = self.attach_token(params);
                self.send(&command, params).await
            }
            Release::Abandon(err) => {
                debug!(command, error = %err, "request abandoned after failed re-authentication");
                Err(DispatchError::Auth(err))
            }
        }
    }

    /// Run a re-authentication cycle, or wait for the one already in flight.
    ///
    /// Every concurrent caller observes the same outcome.
    ///
    /// # Errors
    ///
    /// Returns the cycle's [`AuthError`]; a stopped worker reads as retryable.
    pub async fn reauthenticate(&self, origin: Option<&str>) -> AuthResult<()> {
        let (respond_to, outcome) = oneshot::channel();
        self.commands
            .send(GateCommand::Reauthenticate {
                origin: origin.map(str::to_string),
                respond_to,
            })
            .await
            .map_err(|_| AuthError::retryable("request gate is not running"))?;
        outcome
            .await
            .map_err(|_| AuthError::retryable("request gate is not running"))?
    }

    /// Send a caller-built Authenticate command directly.
    ///
    /// Used for first sign-in; it neither consults nor changes the gate state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] before any network call when a
    /// required parameter is missing, and [`AuthError::Retryable`] when the
    /// transport fails.
    pub async fn authenticate(&self, params: AuthenticateParams) -> AuthResult<Response> {
        self.coordinator.authenticate(params).await
    }

    /// Whether a re-authentication cycle is in flight.
    #[must_use]
    pub fn is_authenticating(&self) -> bool {
        *self.authenticating.borrow()
    }

    /// Observe transitions of the authenticating flag.
    #[must_use]
    pub fn watch_authenticating(&self) -> watch::Receiver<bool> {
        self.authenticating.clone()
    }

    /// Current session as held by the store.
    #[must_use]
    pub fn session(&self) -> Session {
        self.coordinator.store.session()
    }

    /// Json code that marks a response as "session expired".
    #[must_use]
    pub const fn session_expired_code(&self) -> i64 {
        self.session_expired_code
    }

    fn attach_token(&self, mut params: CommandParams) -> CommandParams {
        if !params.contains_key(PARAM_AUTH_TOKEN)
            && let Some(token) = self.coordinator.store.session().auth_token
        {
            params.insert(PARAM_AUTH_TOKEN.to_string(), Value::String(token));
        }
        params
    }

    async fn send(&self, command: &str, params: CommandParams) -> DispatchResult<Response> {
        self.coordinator
            .transport
            .send(command, params)
            .await
            .map_err(DispatchError::from)
    }
}
