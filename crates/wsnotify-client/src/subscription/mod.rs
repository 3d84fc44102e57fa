//! Inbound fan-out: the subscription registry and the router that feeds it.

mod registry;
mod router;

pub use registry::{Callback, Subscription, SubscriptionRegistry};
pub use router::{DispatchOutcome, MessageRouter};
