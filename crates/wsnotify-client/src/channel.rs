//! Typed channel adapter: one consumer's view of a single message `type`.
//!
//! A `Channel` is stateless glue: `subscribe` wraps the handler in a type
//! filter and registers it, `send` builds the envelope and hands it to the
//! gateway.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use wsnotify_core::error::{ClientError, Result};
use wsnotify_core::Envelope;

use crate::gateway::OutboundGateway;
use crate::hooks::{panic_message, report_to, ErrorHook};
use crate::subscription::{Subscription, SubscriptionRegistry};

#[derive(Clone)]
pub struct Channel {
    msg_type: Arc<str>,
    registry: SubscriptionRegistry,
    gateway: OutboundGateway,
    on_error: Option<ErrorHook>,
}

impl Channel {
    pub(crate) fn new(
        msg_type: impl Into<Arc<str>>,
        registry: SubscriptionRegistry,
        gateway: OutboundGateway,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            registry,
            gateway,
            on_error: None,
        }
    }

    /// Route this consumer's handler and send failures to `f`.
    ///
    /// Handler errors reported here are considered handled and are not
    /// forwarded to the client-wide `on_error` hook.
    pub fn on_error(mut self, f: impl Fn(&ClientError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    pub fn is_connected(&self) -> bool {
        self.gateway.is_connected()
    }

    /// Call `on_message(content, envelope)` for every inbound envelope of this
    /// channel's type. A panic in `on_message` is reported like an `Err`.
    pub fn subscribe<F>(&self, on_message: F) -> Subscription
    where
        F: Fn(&Value, &Envelope) -> Result<()> + Send + Sync + 'static,
    {
        let msg_type = Arc::clone(&self.msg_type);
        let on_error = self.on_error.clone();
        self.registry.register(move |env| {
            if env.msg_type != *msg_type {
                return Ok(());
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| on_message(env.content(), env)))
                .unwrap_or_else(|payload| {
                    Err(ClientError::Handler(format!(
                        "handler panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });
            match outcome {
                Ok(()) => Ok(()),
                Err(e) => match &on_error {
                    Some(hook) => {
                        tracing::warn!(msg_type = %msg_type, error = %e, "channel handler failed");
                        report_to(hook, &e);
                        Ok(())
                    }
                    None => Err(e),
                },
            }
        })
    }

    /// Like [`Channel::subscribe`], deserializing `content` into `T` first.
    /// Content that does not fit `T` is a handler error for this subscriber.
    pub fn subscribe_as<T, F>(&self, on_message: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T, &Envelope) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(move |content, env| {
            let payload = T::deserialize(content).map_err(|e| {
                ClientError::Handler(format!("content of {} does not match: {e}", env.msg_type))
            })?;
            on_message(payload, env)
        })
    }

    /// Send `content` as an envelope of this channel's type.
    ///
    /// `NotConnected` is returned to the caller and also reported to this
    /// channel's `on_error`, if set.
    pub fn send(&self, content: Value) -> Result<()> {
        let env = Envelope::new(&*self.msg_type, content);
        self.gateway.send(env).map_err(|e| {
            tracing::warn!(msg_type = %self.msg_type, error = %e, "channel send failed");
            if let Some(hook) = &self.on_error {
                report_to(hook, &e);
            }
            e
        })
    }

    /// Serialize `content` and send it.
    pub fn send_json<T: Serialize>(&self, content: &T) -> Result<()> {
        let value = serde_json::to_value(content)
            .map_err(|e| ClientError::InvalidEnvelope(format!("content encode failed: {e}")))?;
        self.send(value)
    }
}

