#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Authentication lifecycle event bus.
//!
//! The bus assigns sequential identifiers and keeps a bounded replay ring so
//! observers that subscribe late (a sign-in screen mounting after the redirect,
//! for example) can catch up. Internally it uses `tokio::broadcast`; when a
//! subscriber lags, the oldest events are skipped.

pub mod payloads;
pub mod routing;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
pub use routing::{EventBus, EventStream};
