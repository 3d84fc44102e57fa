//! wsnotify core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the wire-level envelope and the error surface shared by
//! the client runtime and its consumers. It intentionally carries no transport
//! or runtime dependencies so it can be reused by hosts that bring their own
//! socket.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed inbound
//! frames surface as [`ClientError::Decode`] so a hostile peer cannot crash
//! the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ClientError, ErrorKind, Result};
pub use protocol::envelope::Envelope;
