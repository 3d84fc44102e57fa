//! Shared error type across wsnotify crates.

use thiserror::Error;

/// Stable error codes, suitable for logs and host-side branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Inbound frame is not a well-formed envelope.
    Decode,
    /// Send attempted while the connection is not live.
    NotConnected,
    /// Outbound envelope violates the wire invariants.
    InvalidEnvelope,
    /// Socket-level failure.
    Transport,
    /// A subscriber callback failed.
    Handler,
    /// Bad configuration.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Manager was deliberately shut down.
    Closed,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Decode => "DECODE",
            ErrorKind::NotConnected => "NOT_CONNECTED",
            ErrorKind::InvalidEnvelope => "INVALID_ENVELOPE",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Handler => "HANDLER",
            ErrorKind::Config => "CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Closed => "CLOSED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Unified error type used by core and client.
///
/// `Clone` so the same error can be handed to a host hook and returned to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("not connected")]
    NotConnected,
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("connection manager closed")]
    Closed,
    #[error("internal: {0}")]
    Internal(String),
}

impl ClientError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Decode(_) => ErrorKind::Decode,
            ClientError::NotConnected => ErrorKind::NotConnected,
            ClientError::InvalidEnvelope(_) => ErrorKind::InvalidEnvelope,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Handler(_) => ErrorKind::Handler,
            ClientError::Config(_) => ErrorKind::Config,
            ClientError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            ClientError::Closed => ErrorKind::Closed,
            ClientError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap any displayable failure raised by a subscriber.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        ClientError::Handler(err.to_string())
    }

    /// Wrap any displayable socket failure.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        ClientError::Transport(err.to_string())
    }
}
