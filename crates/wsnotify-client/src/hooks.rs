//! Host-supplied lifecycle callbacks.
//!
//! Hooks are fire-and-forget: a panicking hook is logged and swallowed so it
//! can never take the connection driver down with it.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use wsnotify_core::ClientError;

/// Callback without arguments (`on_connect`, `on_disconnect`).
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving an error (`on_error`).
pub type ErrorHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// The set of host callbacks supplied at construction time.
#[derive(Clone, Default)]
pub struct Hooks {
    on_connect: Option<LifecycleHook>,
    on_disconnect: Option<LifecycleHook>,
    on_error: Option<ErrorHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ClientError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn connected(&self) {
        if let Some(f) = &self.on_connect {
            call_guarded("on_connect", || f());
        }
    }

    pub(crate) fn disconnected(&self) {
        if let Some(f) = &self.on_disconnect {
            call_guarded("on_disconnect", || f());
        }
    }

    pub(crate) fn error(&self, err: &ClientError) {
        if let Some(f) = &self.on_error {
            report_to(f, err);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Hand an error to an error hook, swallowing any panic it raises.
pub(crate) fn report_to(hook: &ErrorHook, err: &ClientError) {
    call_guarded("on_error", || hook(err));
}

fn call_guarded(name: &'static str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(hook = name, panic = %panic_message(payload.as_ref()), "host hook panicked");
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
