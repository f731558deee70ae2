//! Collaborator traits the coordinator and gate are wired against.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{CommandParams, Credentials, Response, Session};

/// Sends named commands to the remote API.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Send `command` with `params`, resolving with the structured response.
    async fn send(&self, command: &str, params: CommandParams) -> Result<Response, TransportError>;
}

/// Key/value holder for credentials and session tokens.
///
/// Only the coordinator writes the session.
pub trait SessionStore: Send + Sync {
    /// Stored partner credentials, if the user has signed in.
    fn credentials(&self) -> Option<Credentials>;

    /// Current session tokens.
    fn session(&self) -> Session;

    /// Replace the session tokens.
    fn set_session(&self, session: Session);
}

/// Turns a failed Authenticate response into a displayable reason.
pub trait ErrorClassifier: Send + Sync {
    /// Human-readable failure reason for `response`.
    fn classify(&self, response: &Response) -> String;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&Response) -> String + Send + Sync,
{
    fn classify(&self, response: &Response) -> String {
        self(response)
    }
}

/// Forces the user back to an unauthenticated state.
pub trait SignInRedirector: Send + Sync {
    /// Navigate to sign-in, displaying `reason`.
    fn redirect(&self, reason: &str);
}

impl<F> SignInRedirector for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, reason: &str) {
        self(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct EchoTransport;

    #[async_trait]
    impl CommandTransport for EchoTransport {
        async fn send(
            &self,
            command: &str,
            params: CommandParams,
        ) -> Result<Response, TransportError> {
            if command.is_empty() {
                return Err(TransportError::Closed);
            }
            let mut response = Response::with_code(200);
            response.extra = params;
            Ok(response)
        }
    }

    #[tokio::test]
    async fn transport_trait_objects_are_usable() {
        let transport: Box<dyn CommandTransport> = Box::new(EchoTransport);
        let response = transport
            .send("Ping", CommandParams::new())
            .await
            .expect("ping should succeed");
        assert!(response.is_success());
        assert_eq!(
            transport.send("", CommandParams::new()).await,
            Err(TransportError::Closed)
        );
    }

    #[test]
    fn closures_implement_classifier_and_redirector() {
        let classifier = |response: &Response| format!("code {}", response.json_code);
        assert_eq!(classifier.classify(&Response::with_code(401)), "code 401");

        let seen = Mutex::new(Vec::new());
        let redirector = |reason: &str| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(reason.to_string());
            }
        };
        redirector.redirect("locked");
        assert_eq!(*seen.lock().expect("lock"), vec!["locked".to_string()]);
    }
}
