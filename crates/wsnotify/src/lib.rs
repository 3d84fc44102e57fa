//! Top-level facade crate for wsnotify.
//!
//! Re-exports the protocol core and the client runtime so users can depend on a single crate.

pub mod core {
    pub use wsnotify_core::*;
}

pub mod client {
    pub use wsnotify_client::*;
}
