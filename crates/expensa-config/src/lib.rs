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

//! Typed, validated configuration for the authentication gate.
//!
//! Layout: `model.rs` (`AuthConfig`, `GateConfig`), `loader.rs` (JSON, file
//! and environment loaders), `validate.rs` (field checks), `defaults.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use defaults::{
    ENV_AUTH_TIMEOUT_MS, ENV_COMMAND_BUFFER, ENV_LOG_LEVEL, ENV_PARTNER_NAME,
    ENV_PARTNER_PASSWORD, ENV_SESSION_EXPIRED_CODE,
};
pub use error::{ConfigError, ConfigResult};
pub use model::{AuthConfig, GateConfig};
