#![allow(clippy::redundant_pub_crate)]

//! A single re-authentication cycle and the one-shot Authenticate command.
//!
//! The coordinator never decides *whether* a cycle runs; the worker does that.
//! It only executes one cycle end to end and reports a typed outcome.

use std::sync::Arc;
use std::time::Duration;

use expensa_auth_core::{
    AUTHENTICATE_COMMAND, AuthError, AuthOutcome, AuthResult, AuthenticateParams,
    AuthenticateRequest, CommandParams, CommandTransport, ErrorClassifier, RequestError, Response,
    Session, SessionStore, SignInRedirector, TransportError,
};
use expensa_config::GateConfig;
use tracing::{info, warn};
use uuid::Uuid;

pub(crate) struct Coordinator {
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) transport: Arc<dyn CommandTransport>,
    classifier: Arc<dyn ErrorClassifier>,
    redirector: Arc<dyn SignInRedirector>,
    partner_name: String,
    partner_password: String,
    cycle_timeout: Option<Duration>,
}

impl Coordinator {
    pub(crate) fn new(
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn CommandTransport>,
        classifier: Arc<dyn ErrorClassifier>,
        redirector: Arc<dyn SignInRedirector>,
        config: &GateConfig,
    ) -> Self {
        Self {
            store,
            transport,
            classifier,
            redirector,
            partner_name: config.partner_name.clone(),
            partner_password: config.partner_password.clone(),
            cycle_timeout: config.cycle_timeout,
        }
    }

    /// Exchange the stored credentials for a fresh session.
    ///
    /// Writes the session at most once and redirects at most once.
    pub(crate) async fn run_cycle(
        self: Arc<Self>,
        cycle_id: Uuid,
        origin: Option<String>,
    ) -> AuthResult<()> {
        let origin = origin.as_deref().unwrap_or("unknown");
        let request = match self.cycle_request() {
            Ok(request) => request,
            Err(err) => {
                warn!(%cycle_id, origin, error = %err, "re-authentication is missing inputs");
                return Err(err.into());
            }
        };

        let response = match self.send_bounded(request.into_params()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%cycle_id, origin, error = %err, "re-authentication did not reach the server");
                return Err(AuthError::retryable(err.to_string()));
            }
        };

        match response.auth_outcome() {
            AuthOutcome::Success => self.commit(cycle_id, origin, response),
            AuthOutcome::Offline => {
                warn!(%cycle_id, origin, "re-authentication deferred; backend unreachable");
                Err(AuthError::retryable(self.classifier.classify(&response)))
            }
            AuthOutcome::Rejected => {
                let reason = self.classifier.classify(&response);
                warn!(
                    %cycle_id,
                    origin,
                    json_code = response.json_code,
                    reason = %reason,
                    "credentials rejected; redirecting to sign-in"
                );
                self.redirector.redirect(&reason);
                Err(AuthError::terminal(reason))
            }
        }
    }

    /// Send a caller-built Authenticate command outside of any cycle.
    pub(crate) async fn authenticate(&self, params: AuthenticateParams) -> AuthResult<Response> {
        let request = AuthenticateRequest::new(params)?;
        info!(partner_user_id = request.partner_user_id(), "sending authenticate");
        self.send_bounded(request.into_params())
            .await
            .map_err(|err| AuthError::retryable(err.to_string()))
    }

    fn cycle_request(&self) -> Result<AuthenticateRequest, RequestError> {
        let credentials = self
            .store
            .credentials()
            .ok_or(RequestError::MissingParameter {
                command: AUTHENTICATE_COMMAND,
                parameter: "partnerUserID",
            })?;
        AuthenticateRequest::new(AuthenticateParams {
            use_expensify_login: Some(false),
            partner_name: Some(self.partner_name.clone()),
            partner_password: Some(self.partner_password.clone()),
            partner_user_id: Some(credentials.login),
            partner_user_secret: Some(credentials.secret),
            ..AuthenticateParams::default()
        })
    }

    async fn send_bounded(&self, params: CommandParams) -> Result<Response, TransportError> {
        let send = self.transport.send(AUTHENTICATE_COMMAND, params);
        match self.cycle_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| TransportError::Timeout {
                    command: AUTHENTICATE_COMMAND.to_string(),
                })?,
            None => send.await,
        }
    }

    fn commit(&self, cycle_id: Uuid, origin: &str, response: Response) -> AuthResult<()> {
        let Response {
            auth_token,
            encrypted_auth_token,
            ..
        } = response;
        let session = Session::new(auth_token, encrypted_auth_token);
        if !session.is_valid() {
            warn!(%cycle_id, origin, "authenticate succeeded without issuing a token");
            return Err(AuthError::retryable("authenticate response carried no token"));
        }
        self.store.set_session(session);
        info!(%cycle_id, origin, "session refreshed");
        Ok(())
    }
}
