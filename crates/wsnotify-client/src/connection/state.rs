use std::fmt;

/// Connectivity of the managed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket and no pending attempt (initial, closed, or out of attempts).
    Disconnected,
    /// A transport is being constructed.
    Connecting,
    /// Socket is open; sends are accepted.
    Connected,
    /// Socket dropped; a reconnect timer is pending.
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State plus the generation of the transport it refers to.
///
/// The generation is bumped for every new transport and on shutdown, so a
/// timer or an outbound frame captured under an older generation can tell it
/// no longer refers to the live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub generation: u64,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            generation: 0,
        }
    }
}
