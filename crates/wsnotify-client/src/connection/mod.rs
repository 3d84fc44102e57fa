//! Connection lifecycle: state, reconnect policy, and the manager that owns
//! the socket.

mod backoff;
mod manager;
mod state;

pub use backoff::ReconnectPolicy;
pub use manager::ConnectionManager;
pub use state::{ConnectionState, LinkStatus};
