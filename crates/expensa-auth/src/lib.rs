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

//! Request gate and re-authentication coordinator.
//!
//! A single worker task owns the `isAuthenticating` flag and the list of
//! requests held behind an in-flight cycle. [`AuthGate`] handles talk to it
//! over a command channel; [`ReauthenticatingClient`] adds the
//! "expired session → re-authenticate → replay once" policy on top.

/// Readable reasons for rejected Authenticate responses.
pub mod classifier;
mod command;
mod coordinator;
/// Gate handle and its collaborators.
pub mod gate;
/// Session-expiry middleware.
pub mod middleware;
/// In-memory session store.
pub mod store;
mod worker;

pub use classifier::DefaultErrorClassifier;
pub use expensa_config::GateConfig;
pub use gate::{AuthGate, GateDependencies};
pub use middleware::ReauthenticatingClient;
pub use store::InMemorySessionStore;
