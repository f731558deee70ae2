//! Scripted collaborators for exercising the gate without a backend.
//!
//! `ScriptedTransport` behaves like a tiny backend: it answers `Authenticate`
//! from a script and accepts any other command only when it carries the token
//! issued by the most recent successful `Authenticate`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use expensa_auth_core::model::PARAM_AUTH_TOKEN;
use expensa_auth_core::{
    AUTHENTICATE_COMMAND, CommandParams, CommandTransport, Response, SignInRedirector,
    TransportError, json_code,
};
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

/// One scripted answer to an `Authenticate` call.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this response.
    Respond(Response),
    /// Fail at the transport layer.
    Fail(TransportError),
    /// Panic inside the transport call.
    Panic,
}

/// A command observed by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SentCommand {
    /// Command name.
    pub command: String,
    /// Parameters as received.
    pub params: CommandParams,
}

impl SentCommand {
    /// The `authToken` parameter, if present.
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.params.get(PARAM_AUTH_TOKEN).and_then(Value::as_str)
    }
}

#[derive(Default)]
struct TransportState {
    authenticate_script: VecDeque<ScriptedReply>,
    command_script: HashMap<String, VecDeque<Response>>,
    accepted_token: Option<String>,
    sent: Vec<SentCommand>,
}

/// In-memory [`CommandTransport`] driven by a script.
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<TransportState>,
    latch: Option<Semaphore>,
    sent_notify: Notify,
}

impl ScriptedTransport {
    /// Transport whose `Authenticate` calls complete immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose `Authenticate` calls block until [`Self::release_authenticate`].
    #[must_use]
    pub fn latched() -> Self {
        Self {
            latch: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Treat `token` as the backend's currently valid session token.
    #[must_use]
    pub fn accepting(self, token: impl Into<String>) -> Self {
        self.lock().accepted_token = Some(token.into());
        self
    }

    /// Queue the next `Authenticate` reply.
    pub fn script_authenticate(&self, reply: ScriptedReply) {
        self.lock().authenticate_script.push_back(reply);
    }

    /// Queue a successful `Authenticate` that issues `token`.
    pub fn script_token(&self, token: &str) {
        self.script_authenticate(ScriptedReply::Respond(Response::authenticated(
            token,
            Some(format!("enc-{token}")),
        )));
    }

    /// Queue a one-off response for `command`, bypassing token checks.
    pub fn script_command(&self, command: &str, response: Response) {
        self.lock()
            .command_script
            .entry(command.to_string())
            .or_default()
            .push_back(response);
    }

    /// Let `count` blocked `Authenticate` calls finish.
    pub fn release_authenticate(&self, count: usize) {
        if let Some(latch) = &self.latch {
            latch.add_permits(count);
        }
    }

    /// Every command observed so far, in arrival order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentCommand> {
        self.lock().sent.clone()
    }

    /// Commands named `command` observed so far.
    #[must_use]
    pub fn sent_named(&self, command: &str) -> Vec<SentCommand> {
        self.lock()
            .sent
            .iter()
            .filter(|sent| sent.command == command)
            .cloned()
            .collect()
    }

    /// Number of `Authenticate` calls observed so far.
    #[must_use]
    pub fn authenticate_calls(&self) -> usize {
        self.sent_named(AUTHENTICATE_COMMAND).len()
    }

    /// Wait until at least `count` commands named `command` have arrived.
    pub async fn wait_for(&self, command: &str, count: usize) {
        loop {
            let notified = self.sent_notify.notified();
            if self.sent_named(command).len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, command: &str, params: &CommandParams) {
        self.lock().sent.push(SentCommand {
            command: command.to_string(),
            params: params.clone(),
        });
        self.sent_notify.notify_waiters();
    }

    async fn authenticate(&self) -> Result<Response, TransportError> {
        if let Some(latch) = &self.latch {
            let permit = latch.acquire().await.map_err(|_| TransportError::Closed)?;
            permit.forget();
        }
        let reply = self.lock().authenticate_script.pop_front();
        match reply {
            Some(ScriptedReply::Respond(response)) => {
                if response.is_success() {
                    self.lock().accepted_token.clone_from(&response.auth_token);
                }
                Ok(response)
            }
            Some(ScriptedReply::Fail(err)) => Err(err),
            Some(ScriptedReply::Panic) => panic!("scripted transport panic"),
            None => Err(TransportError::Closed),
        }
    }

    fn answer(&self, command: &str, params: &CommandParams) -> Response {
        let (scripted, accepted) = {
            let mut state = self.lock();
            let scripted = state
                .command_script
                .get_mut(command)
                .and_then(VecDeque::pop_front);
            (scripted, state.accepted_token.clone())
        };
        if let Some(response) = scripted {
            return response;
        }
        let presented = params.get(PARAM_AUTH_TOKEN).and_then(Value::as_str);
        match (accepted.as_deref(), presented) {
            (Some(accepted), Some(presented)) if accepted == presented => {
                let mut response = Response::with_code(json_code::SUCCESS);
                response
                    .extra
                    .insert("command".into(), Value::String(command.to_string()));
                response
            }
            _ => Response::with_code(json_code::NOT_AUTHENTICATED),
        }
    }
}

#[async_trait]
impl CommandTransport for ScriptedTransport {
    async fn send(&self, command: &str, params: CommandParams) -> Result<Response, TransportError> {
        self.record(command, &params);
        if command == AUTHENTICATE_COMMAND {
            return self.authenticate().await;
        }
        Ok(self.answer(command, &params))
    }
}

/// [`SignInRedirector`] that records every redirect.
#[derive(Debug, Default)]
pub struct RecordingRedirector {
    reasons: Mutex<Vec<String>>,
}

impl RecordingRedirector {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reasons passed to `redirect`, in order.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of redirects issued.
    #[must_use]
    pub fn count(&self) -> usize {
        self.reasons().len()
    }
}

impl SignInRedirector for RecordingRedirector {
    fn redirect(&self, reason: &str) {
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn with_token(token: &str) -> CommandParams {
        let mut params = CommandParams::new();
        params.insert(PARAM_AUTH_TOKEN.into(), Value::String(token.into()));
        params
    }

    #[tokio::test]
    async fn accepts_only_the_issued_token() -> Result<(), TransportError> {
        let transport = ScriptedTransport::new().accepting("tok1");
        assert!(transport.send("Get", with_token("tok1")).await?.is_success());
        assert_eq!(
            transport.send("Get", with_token("stale")).await?.json_code,
            json_code::NOT_AUTHENTICATED
        );

        transport.script_token("tok2");
        let issued = transport.send(AUTHENTICATE_COMMAND, CommandParams::new()).await?;
        assert_eq!(issued.auth_token.as_deref(), Some("tok2"));
        assert!(!transport.send("Get", with_token("tok1")).await?.is_success());
        assert!(transport.send("Get", with_token("tok2")).await?.is_success());
        assert_eq!(transport.authenticate_calls(), 1);
        assert_eq!(transport.sent().len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn latched_authenticate_waits_for_release() {
        let transport = Arc::new(ScriptedTransport::latched());
        transport.script_token("tok2");
        let pending = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                transport
                    .send(AUTHENTICATE_COMMAND, CommandParams::new())
                    .await
            })
        };
        transport.wait_for(AUTHENTICATE_COMMAND, 1).await;
        assert!(!pending.is_finished());
        transport.release_authenticate(1);
        let response = pending.await.expect("join").expect("send");
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn scripted_command_responses_take_precedence() -> Result<(), TransportError> {
        let transport = ScriptedTransport::new();
        transport.script_command("Get", Response::with_code(402));
        assert_eq!(transport.send("Get", CommandParams::new()).await?.json_code, 402);
        assert_eq!(
            transport.send("Get", CommandParams::new()).await?.json_code,
            json_code::NOT_AUTHENTICATED
        );
        Ok(())
    }

    #[test]
    fn redirector_records_reasons() {
        let redirector = RecordingRedirector::new();
        redirector.redirect("locked");
        assert_eq!(redirector.reasons(), vec!["locked".to_string()]);
        assert_eq!(redirector.count(), 1);
    }
}
