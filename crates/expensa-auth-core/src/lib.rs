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

//! Transport-agnostic contracts for session re-authentication.
//!
//! Layout: `model/` (credentials, session, wire shapes), `service/`
//! (collaborator traits), `error.rs` (retryable/terminal/precondition taxonomy).

pub mod error;
pub mod model;
pub mod service;

pub use error::{AuthError, AuthResult, DispatchError, DispatchResult, RequestError, TransportError};
pub use model::{
    AUTHENTICATE_COMMAND, AuthOutcome, AuthenticateParams, AuthenticateRequest, CommandParams,
    Credentials, Response, Session, forces_network_request, json_code,
};
pub use service::{CommandTransport, ErrorClassifier, SessionStore, SignInRedirector};
