//! Shared wiring for the gate integration suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use expensa_auth::{AuthGate, GateConfig, GateDependencies, InMemorySessionStore};
use expensa_auth_core::{Credentials, Session, SessionStore};
use expensa_events::EventBus;
use expensa_telemetry::Metrics;
use expensa_test_support::fixtures;
use expensa_test_support::mocks::{RecordingRedirector, ScriptedTransport};

/// Token held by the store before any cycle runs.
pub const STALE_TOKEN: &str = "tok1";

/// Session store that counts writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemorySessionStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn signed_in() -> Self {
        Self {
            inner: InMemorySessionStore::with_credentials(fixtures::credentials())
                .with_session(Session::new(Some(STALE_TOKEN.into()), None)),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SessionStore for CountingStore {
    fn credentials(&self) -> Option<Credentials> {
        self.inner.credentials()
    }

    fn session(&self) -> Session {
        self.inner.session()
    }

    fn set_session(&self, session: Session) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_session(session);
    }
}

pub struct Harness {
    pub gate: AuthGate,
    pub store: Arc<CountingStore>,
    pub transport: Arc<ScriptedTransport>,
    pub redirector: Arc<RecordingRedirector>,
    pub events: EventBus,
    pub metrics: Metrics,
}

impl Harness {
    /// Signed-in user whose backend only accepts tokens issued by `Authenticate`.
    pub fn new(transport: ScriptedTransport) -> anyhow::Result<Self> {
        Self::build(CountingStore::signed_in(), transport, &fixtures::gate_config())
    }

    pub fn build(
        store: CountingStore,
        transport: ScriptedTransport,
        config: &GateConfig,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let redirector = Arc::new(RecordingRedirector::new());
        let events = EventBus::with_capacity(64);
        let metrics = Metrics::new()?;
        let deps = GateDependencies::new(store.clone(), transport.clone(), redirector.clone())
            .with_events(events.clone())
            .with_metrics(metrics.clone());
        Ok(Self {
            gate: AuthGate::spawn(deps, config),
            store,
            transport,
            redirector,
            events,
            metrics,
        })
    }

    /// Wait until `count` callers have joined the in-flight cycle.
    pub async fn joined(&self, count: u64) {
        let metrics = self.metrics.clone();
        wait_until(move || metrics.snapshot().cycle_joins_total >= count).await;
    }

    /// Wait until `count` requests are held at the gate.
    pub async fn held(&self, count: i64) {
        let metrics = self.metrics.clone();
        wait_until(move || metrics.snapshot().held_requests >= count).await;
    }
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
