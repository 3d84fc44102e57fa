use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use wsnotify_core::protocol::text::decode_frame;
use wsnotify_core::ClientError;

use crate::hooks::{panic_message, Hooks};
use crate::obs::ClientMetrics;

use super::SubscriptionRegistry;

/// Result of routing one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Frame did not decode; nothing was delivered.
    Dropped,
    /// Frame was offered to every callback in the snapshot.
    Delivered { invoked: usize, failed: usize },
}

/// Decodes inbound frames and fans them out to the registry.
#[derive(Clone)]
pub struct MessageRouter {
    registry: SubscriptionRegistry,
    hooks: Hooks,
    metrics: Arc<ClientMetrics>,
}

impl MessageRouter {
    pub fn new(registry: SubscriptionRegistry, hooks: Hooks, metrics: Arc<ClientMetrics>) -> Self {
        Self {
            registry,
            hooks,
            metrics,
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    /// Route one raw text frame.
    ///
    /// Delivery uses the callbacks registered when the call starts, in
    /// registration order. A failing or panicking callback is reported to
    /// `on_error` and the remaining callbacks still run.
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        let env = match decode_frame(raw) {
            Ok(env) => env,
            Err(e) => {
                self.metrics.decode_errors.inc(&[]);
                tracing::warn!(error = %e, bytes_len = raw.len(), "dropping malformed frame");
                return DispatchOutcome::Dropped;
            }
        };

        let started = Instant::now();
        let msg_type = env.msg_type.as_str();
        self.metrics.frames_in.inc(&[("msg_type", msg_type)]);

        let snapshot = self.registry.snapshot();
        let mut failed = 0;
        for callback in &snapshot {
            let err = match catch_unwind(AssertUnwindSafe(|| callback(&env))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(payload) => ClientError::Handler(format!(
                    "callback panicked: {}",
                    panic_message(payload.as_ref())
                )),
            };
            failed += 1;
            self.metrics.handler_errors.inc(&[("msg_type", msg_type)]);
            tracing::warn!(msg_type, error = %err, "subscriber failed");
            self.hooks.error(&err);
        }

        self.metrics
            .dispatch_duration
            .observe(&[("msg_type", msg_type)], started.elapsed());
        tracing::debug!(msg_type, subscribers = snapshot.len(), failed, "frame dispatched");

        DispatchOutcome::Delivered {
            invoked: snapshot.len(),
            failed,
        }
    }
}
