//! Publishing and subscribing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Id counter and replay ring, guarded together so ids reach subscribers in order.
struct Ledger {
    last_id: EventId,
    ring: VecDeque<EventEnvelope>,
    capacity: usize,
}

impl Ledger {
    fn record(&mut self, event: Event) -> EventEnvelope {
        self.last_id = self.last_id.saturating_add(1);
        let envelope = EventEnvelope {
            id: self.last_id,
            timestamp: Utc::now(),
            event,
        };
        if self.ring.len() == self.capacity {
            let _ = self.ring.pop_front();
        }
        self.ring.push_back(envelope.clone());
        envelope
    }

    fn after(&self, id: EventId) -> impl Iterator<Item = &EventEnvelope> {
        self.ring.iter().filter(move |envelope| envelope.id > id)
    }
}

/// Cloneable bus for authentication lifecycle events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    ledger: Arc<Mutex<Ledger>>,
}

impl EventBus {
    /// Bus keeping the last `capacity` events for replay.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            ledger: Arc::new(Mutex::new(Ledger {
                last_id: 0,
                ring: VecDeque::with_capacity(capacity),
                capacity,
            })),
        }
    }

    /// Bus with [`DEFAULT_REPLAY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish `event` and return its id. Having no subscribers is not an error.
    pub fn publish(&self, event: Event) -> EventId {
        let mut ledger = self.ledger();
        let envelope = ledger.record(event);
        let id = envelope.id;
        let _ = self.sender.send(envelope);
        drop(ledger);
        id
    }

    /// Subscribe to live events, first replaying retained events newer than `since`.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        let ledger = self.ledger();
        let receiver = self.sender.subscribe();
        let backlog: VecDeque<_> = since
            .map(|since| ledger.after(since).cloned().collect())
            .unwrap_or_default();
        let seen = backlog.back().map_or(ledger.last_id, |envelope| envelope.id);
        drop(ledger);
        EventStream {
            backlog,
            receiver,
            seen,
        }
    }

    /// Id of the most recent event, if any was published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let last = self.ledger().last_id;
        (last > 0).then_some(last)
    }

    /// Retained events newer than `id`.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        self.ledger().after(id).cloned().collect()
    }

    /// Retained events belonging to one re-authentication cycle, oldest first.
    #[must_use]
    pub fn cycle_history(&self, cycle_id: Uuid) -> Vec<EventEnvelope> {
        self.ledger()
            .ring
            .iter()
            .filter(|envelope| envelope.event.cycle_id() == cycle_id)
            .cloned()
            .collect()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Replayed events first, then live ones, without duplicates.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: broadcast::Receiver<EventEnvelope>,
    seen: EventId,
}

impl EventStream {
    /// Next event, or `None` once every bus handle is dropped.
    ///
    /// A lagging subscriber skips the events it missed.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.id > self.seen => {
                    self.seen = envelope.id;
                    return Some(envelope);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
