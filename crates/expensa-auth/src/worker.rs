#![allow(clippy::redundant_pub_crate)]

use crate::{
    command::{GateCommand, PendingRequest},
    coordinator::Coordinator,
};
use expensa_auth_core::{AuthError, AuthResult};
use expensa_events::{Event, EventBus};
use expensa_telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub(crate) fn spawn(
    coordinator: Arc<Coordinator>,
    events: EventBus,
    metrics: Option<Metrics>,
    flag: watch::Sender<bool>,
    mut commands: mpsc::Receiver<GateCommand>,
) {
    tokio::spawn(async move {
        let mut worker = Worker::new(coordinator, events, metrics, flag);
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => worker.handle(command),
                        None => break,
                    }
                }
                outcome = join_cycle(&mut worker.phase) => worker.finish(outcome),
            }
        }
        if let Phase::Authenticating(cycle) = &mut worker.phase {
            let outcome = resolve(&mut cycle.handle).await;
            worker.finish(outcome);
        }
        debug!("gate worker stopped");
    });
}

enum Phase {
    Idle,
    Authenticating(Cycle),
}

struct Cycle {
    id: Uuid,
    origin: Option<String>,
    started: Instant,
    handle: JoinHandle<AuthResult<()>>,
    waiters: Vec<oneshot::Sender<AuthResult<()>>>,
    held: Vec<PendingRequest>,
}

struct Worker {
    coordinator: Arc<Coordinator>,
    events: EventBus,
    metrics: Option<Metrics>,
    flag: watch::Sender<bool>,
    phase: Phase,
}

impl Worker {
    const fn new(
        coordinator: Arc<Coordinator>,
        events: EventBus,
        metrics: Option<Metrics>,
        flag: watch::Sender<bool>,
    ) -> Self {
        Self {
            coordinator,
            events,
            metrics,
            flag,
            phase: Phase::Idle,
        }
    }

    fn handle(&mut self, command: GateCommand) {
        match command {
            GateCommand::Admit { pending } => self.admit(pending),
            GateCommand::Reauthenticate { origin, respond_to } => {
                self.reauthenticate(origin, respond_to);
            }
        }
    }

    fn admit(&mut self, pending: PendingRequest) {
        let Phase::Authenticating(cycle) = &mut self.phase else {
            pending.proceed();
            return;
        };
        debug!(
            cycle_id = %cycle.id,
            command = %pending.command,
            "holding request until re-authentication resolves"
        );
        cycle.held.push(pending);
        if let Some(metrics) = &self.metrics {
            metrics.set_held_requests(cycle.held.len());
        }
    }

    fn reauthenticate(
        &mut self,
        origin: Option<String>,
        respond_to: oneshot::Sender<AuthResult<()>>,
    ) {
        if let Phase::Authenticating(cycle) = &mut self.phase {
            debug!(
                cycle_id = %cycle.id,
                origin = origin.as_deref().unwrap_or("unknown"),
                "joining in-flight re-authentication"
            );
            cycle.waiters.push(respond_to);
            if let Some(metrics) = &self.metrics {
                metrics.inc_cycle_join();
            }
            return;
        }

        let id = Uuid::new_v4();
        info!(
            cycle_id = %id,
            origin = origin.as_deref().unwrap_or("unknown"),
            "starting re-authentication"
        );
        self.flag.send_replace(true);
        let handle = tokio::spawn(Arc::clone(&self.coordinator).run_cycle(id, origin.clone()));
        self.phase = Phase::Authenticating(Cycle {
            id,
            origin: origin.clone(),
            started: Instant::now(),
            handle,
            waiters: vec![respond_to],
            held: Vec::new(),
        });
        self.events.publish(Event::AuthenticationStarted {
            cycle_id: id,
            origin,
        });
    }

    fn finish(&mut self, outcome: AuthResult<()>) {
        let Phase::Authenticating(cycle) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        self.flag.send_replace(false);

        let Cycle {
            id,
            origin,
            started,
            waiters,
            held,
            ..
        } = cycle;

        let mut replayed = 0;
        let mut abandoned = 0;
        for pending in held {
            match &outcome {
                Ok(()) => {
                    pending.proceed();
                    replayed += 1;
                }
                Err(err) => {
                    pending.abandon(err.clone());
                    abandoned += 1;
                }
            }
        }
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        let label = outcome_label(&outcome);
        info!(
            cycle_id = %id,
            origin = origin.as_deref().unwrap_or("unknown"),
            outcome = label,
            replayed,
            abandoned,
            "re-authentication finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.observe_cycle(label, started.elapsed());
            metrics.set_held_requests(0);
            metrics.inc_released("replayed", replayed);
            metrics.inc_released("abandoned", abandoned);
            if matches!(outcome, Err(AuthError::Terminal { .. })) {
                metrics.inc_sign_in_redirect();
            }
        }
        self.publish_outcome(id, &outcome);
        self.events.publish(Event::RequestsReleased {
            cycle_id: id,
            replayed,
            abandoned,
        });
    }

    fn publish_outcome(&self, cycle_id: Uuid, outcome: &AuthResult<()>) {
        let event = match outcome {
            Ok(()) => Event::SessionRefreshed { cycle_id },
            Err(AuthError::Retryable { reason }) => Event::AuthenticationDeferred {
                cycle_id,
                reason: reason.clone(),
            },
            Err(AuthError::Terminal { reason }) => Event::SignInRequired {
                cycle_id,
                reason: reason.clone(),
            },
            Err(err @ AuthError::InvalidRequest(_)) => Event::AuthenticationMisconfigured {
                cycle_id,
                detail: err.to_string(),
            },
        };
        self.events.publish(event);
    }
}

const fn outcome_label(outcome: &AuthResult<()>) -> &'static str {
    match outcome {
        Ok(()) => "success",
        Err(AuthError::Retryable { .. }) => "retryable",
        Err(AuthError::Terminal { .. }) => "terminal",
        Err(AuthError::InvalidRequest(_)) => "invalid_request",
    }
}

async fn join_cycle(phase: &mut Phase) -> AuthResult<()> {
    match phase {
        Phase::Authenticating(cycle) => resolve(&mut cycle.handle).await,
        Phase::Idle => std::future::pending().await,
    }
}

async fn resolve(handle: &mut JoinHandle<AuthResult<()>>) -> AuthResult<()> {
    match handle.await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(error = %err, "re-authentication task did not complete");
            Err(AuthError::retryable("re-authentication task did not complete"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DefaultErrorClassifier;
    use crate::command::Release;
    use crate::store::InMemorySessionStore;
    use expensa_auth_core::{AUTHENTICATE_COMMAND, CommandParams, Response, json_code};
    use expensa_events::EventStream;
    use expensa_test_support::fixtures;
    use expensa_test_support::mocks::{RecordingRedirector, ScriptedReply, ScriptedTransport};
    use std::time::Duration;
    use tokio::time::timeout;

    fn worker(transport: Arc<ScriptedTransport>, metrics: Option<Metrics>) -> (Worker, EventBus) {
        let store = Arc::new(InMemorySessionStore::with_credentials(fixtures::credentials()));
        let coordinator = Arc::new(Coordinator::new(
            store,
            transport,
            Arc::new(DefaultErrorClassifier),
            Arc::new(RecordingRedirector::new()),
            &fixtures::gate_config(),
        ));
        let bus = EventBus::with_capacity(16);
        let (flag, _) = watch::channel(false);
        (Worker::new(coordinator, bus.clone(), metrics, flag), bus)
    }

    async fn next_event(stream: &mut EventStream) -> Option<Event> {
        timeout(Duration::from_millis(200), stream.next())
            .await
            .ok()
            .flatten()
            .map(|envelope| envelope.event)
    }

    #[tokio::test]
    async fn idle_admission_proceeds_immediately() {
        let (mut worker, _) = worker(Arc::new(ScriptedTransport::new()), None);
        let (pending, receiver) = PendingRequest::new("OpenReport".into(), CommandParams::new());
        worker.handle(GateCommand::Admit { pending });
        assert!(matches!(receiver.await, Ok(Release::Proceed { .. })));
    }

    #[tokio::test]
    async fn second_trigger_joins_the_first_cycle() -> anyhow::Result<()> {
        let transport = Arc::new(ScriptedTransport::latched());
        transport.script_token("tok2");
        let metrics = Metrics::new()?;
        let (mut worker, bus) = worker(transport.clone(), Some(metrics.clone()));
        let mut stream = bus.subscribe(None);

        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        worker.handle(GateCommand::Reauthenticate {
            origin: Some("OpenReport".into()),
            respond_to: first_tx,
        });
        worker.handle(GateCommand::Reauthenticate {
            origin: Some("Search".into()),
            respond_to: second_tx,
        });
        let (pending, held_rx) = PendingRequest::new("ReadNewestAction".into(), CommandParams::new());
        worker.handle(GateCommand::Admit { pending });
        assert!(*worker.flag.borrow());
        assert_eq!(metrics.snapshot().held_requests, 1);
        assert_eq!(metrics.snapshot().cycle_joins_total, 1);

        transport.release_authenticate(1);
        let outcome = join_cycle(&mut worker.phase).await;
        worker.finish(outcome);

        assert!(!*worker.flag.borrow());
        assert_eq!(first_rx.await?, Ok(()));
        assert_eq!(second_rx.await?, Ok(()));
        assert!(matches!(held_rx.await?, Release::Proceed { .. }));
        assert_eq!(transport.authenticate_calls(), 1);
        assert_eq!(metrics.cycles("success"), 1);
        assert_eq!(metrics.released("replayed"), 1);

        assert!(matches!(
            next_event(&mut stream).await,
            Some(Event::AuthenticationStarted { .. })
        ));
        assert!(matches!(
            next_event(&mut stream).await,
            Some(Event::SessionRefreshed { .. })
        ));
        assert!(matches!(
            next_event(&mut stream).await,
            Some(Event::RequestsReleased {
                replayed: 1,
                abandoned: 0,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn failed_cycle_abandons_held_requests() -> anyhow::Result<()> {
        let transport = Arc::new(ScriptedTransport::latched());
        transport.script_authenticate(ScriptedReply::Respond(Response::with_code(
            json_code::UNABLE_TO_RETRY,
        )));
        let (mut worker, _) = worker(transport.clone(), None);
        let (tx, rx) = oneshot::channel();
        worker.handle(GateCommand::Reauthenticate {
            origin: None,
            respond_to: tx,
        });
        let (pending, held_rx) = PendingRequest::new("OpenReport".into(), CommandParams::new());
        worker.handle(GateCommand::Admit { pending });

        transport.release_authenticate(1);
        let outcome = join_cycle(&mut worker.phase).await;
        worker.finish(outcome);

        let shared = rx.await?;
        assert!(shared.as_ref().is_err_and(AuthError::is_retryable));
        match held_rx.await? {
            Release::Abandon(err) => assert_eq!(Err(err), shared),
            Release::Proceed { .. } => panic!("held request should be abandoned"),
        }
        assert_eq!(transport.sent_named("OpenReport").len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn panicked_cycle_resolves_as_retryable() -> anyhow::Result<()> {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_authenticate(ScriptedReply::Panic);
        let (mut worker, _) = worker(transport.clone(), None);
        let (tx, rx) = oneshot::channel();
        worker.handle(GateCommand::Reauthenticate {
            origin: Some(AUTHENTICATE_COMMAND.into()),
            respond_to: tx,
        });
        let outcome = join_cycle(&mut worker.phase).await;
        worker.finish(outcome);

        assert!(!*worker.flag.borrow());
        assert!(rx.await?.is_err_and(|err| err.is_retryable()));
        assert!(matches!(worker.phase, Phase::Idle));
        Ok(())
    }

    #[test]
    fn outcome_labels_cover_every_branch() {
        assert_eq!(outcome_label(&Ok(())), "success");
        assert_eq!(outcome_label(&Err(AuthError::retryable("x"))), "retryable");
        assert_eq!(outcome_label(&Err(AuthError::terminal("x"))), "terminal");
    }
}
