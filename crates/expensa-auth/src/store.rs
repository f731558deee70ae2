//! Process-local session store.

use std::sync::{PoisonError, RwLock};

use expensa_auth_core::{Credentials, Session, SessionStore};

/// [`SessionStore`] backed by in-memory locks.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    credentials: RwLock<Option<Credentials>>,
    session: RwLock<Session>,
}

impl InMemorySessionStore {
    /// Store with no credentials and no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `credentials`.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
            session: RwLock::default(),
        }
    }

    /// Seed the current session.
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        self
    }

    /// Replace the stored credentials wholesale after a fresh login.
    pub fn replace_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }
}

impl SessionStore for InMemorySessionStore {
    fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_session(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_replaced_wholesale() {
        let store = InMemorySessionStore::with_credentials(Credentials::new("old", "s1"));
        store.replace_credentials(Credentials::new("new", "s2"));
        assert_eq!(store.credentials(), Some(Credentials::new("new", "s2")));
    }

    #[test]
    fn session_round_trips_through_the_trait() {
        let store = InMemorySessionStore::new()
            .with_session(Session::new(Some("tok0".into()), None));
        assert_eq!(store.session().auth_token.as_deref(), Some("tok0"));
        store.set_session(Session::new(Some("tok1".into()), Some("enc1".into())));
        assert_eq!(
            store.session(),
            Session::new(Some("tok1".into()), Some("enc1".into()))
        );
        assert!(store.credentials().is_none());
    }
}
