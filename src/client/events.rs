use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::registry::Handle;

/// Receives `(topic, payload)` for every message arriving on a handle.
pub type MessageHandler = Box<dyn FnMut(String, String) + Send>;

/// Receives the reason of an unexpected connection loss.
pub type DisconnectHandler = Box<dyn FnOnce(String) + Send>;

/// Per-handle destination for inbound events.
///
/// The sink starts armed. Once disarmed (by `close` or a failed connect) it
/// silently drops everything, so a drop caused by an explicit close is never
/// reported as a connection loss. The disconnect handler fires at most once.
pub struct EventSink {
    handle: Handle,
    armed: AtomicBool,
    on_message: Mutex<MessageHandler>,
    on_disconnect: Mutex<Option<DisconnectHandler>>,
}

impl EventSink {
    pub fn new(handle: Handle, on_message: MessageHandler, on_disconnect: DisconnectHandler) -> Self {
        Self {
            handle,
            armed: AtomicBool::new(true),
            on_message: Mutex::new(on_message),
            on_disconnect: Mutex::new(Some(on_disconnect)),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Delivers a message; the payload is decoded as UTF-8, replacing
    /// invalid sequences.
    pub fn message_arrived(&self, topic: &str, payload: &[u8]) {
        if !self.is_armed() {
            debug!("{}: dropping message on {topic} after close", self.handle);
            return;
        }

        let payload = String::from_utf8_lossy(payload).into_owned();
        let mut guard = self.on_message.lock().unwrap_or_else(PoisonError::into_inner);
        let handler = &mut *guard;
        handler(topic.to_string(), payload);
    }

    /// Reports an unexpected loss of the session.
    pub fn connection_lost(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.is_armed() {
            debug!("{}: ignoring connection loss after close: {reason}", self.handle);
            return;
        }

        let handler = self
            .on_disconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handler {
            Some(handler) => {
                info!("{}: connection lost: {reason}", self.handle);
                handler(reason);
            }
            None => debug!("{}: connection loss already reported", self.handle),
        }
    }

    /// Stops all further delivery. Returns whether the sink was armed.
    pub(crate) fn disarm(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("handle", &self.handle)
            .field("armed", &self.is_armed())
            .finish()
    }
}
