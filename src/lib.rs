//! Internal API access layer and git-operation forwarder for a git-hosting
//! edge process.
//!
//! The crate has two independent halves:
//!
//! - A set of operation clients ([`authorized_keys`], [`personal_access_token`],
//!   [`git_audit_event`], [`discover`]) that talk to the control-plane internal
//!   API over HTTP(S) or a local Unix socket.  Every raw response is run
//!   through a single classification procedure ([`response::classify`]) that
//!   deterministically maps it to a typed success value or an [`error::ApiError`].
//! - A [`forwarder`] that relays a git `upload-pack` exchange's three byte
//!   streams across a caller-supplied remote connection, preserving the
//!   remote-reported exit code and supporting prompt cancellation.

pub mod authorized_keys;
pub mod client;
pub mod config;
pub mod discover;
pub mod error;
pub mod forwarder;
pub mod git_audit_event;
pub mod personal_access_token;
pub mod response;

pub use client::ApiClient;
pub use config::EndpointConfig;
pub use error::{ApiError, ForwardError};
