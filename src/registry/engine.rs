//! Registry engine
//!
//! Owns the handle -> connection map and bridges every request to the
//! callback-driven client API:
//! - a fresh [`Completion`] is created per request and handed to the client;
//!   the caller awaits the paired [`PendingOutcome`]
//! - a completion can be settled only once, and one that is dropped
//!   unsettled surfaces as abandoned instead of hanging the caller
//! - no timeouts are added; the client's own timeouts apply
//!
//! Concurrency notes:
//! - the map is behind a `std::sync::Mutex` and the lock is never held
//!   across an await or while calling into a client or a handler
//! - `close` invalidates a handle immediately; a request already in flight on
//!   that handle settles with whatever the client reports (or abandoned)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::handle::Handle;
use crate::client::{
    ClientFactory, Completion, ConnectOptions, Endpoint, EventSink, MessagingClient, Outcome,
};
use crate::utils::error::{Error, Result};

/// Path segment every client is bound to.
pub const ENDPOINT_PATH: &str = "/mqtt";

struct Entry {
    client: Arc<dyn MessagingClient>,
    events: Arc<EventSink>,
}

struct Inner {
    factory: Arc<dyn ClientFactory>,
    next_handle: AtomicU64,
    entries: Mutex<HashMap<Handle, Entry>>,
}

/// Handle-based front end over a [`ClientFactory`].
///
/// Cloning is cheap and every clone shares the same map and counter.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    pub fn new(factory: impl ClientFactory + 'static) -> Self {
        Self::with_factory(Arc::new(factory))
    }

    pub fn with_factory(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                next_handle: AtomicU64::new(0),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Handle, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a connection to `host:port` and resolves with its handle once
    /// the handshake succeeds.
    ///
    /// The handle is registered and both handlers are armed before the
    /// handshake starts. On failure the entry is removed again, so the
    /// allocated handle never becomes addressable. Dropping the returned
    /// future before it resolves has the same effect.
    pub async fn connect<D, M>(
        &self,
        host: &str,
        port: u16,
        client_id: &str,
        on_disconnect: D,
        on_message: M,
    ) -> Result<Handle>
    where
        D: FnOnce(String) + Send + 'static,
        M: FnMut(String, String) + Send + 'static,
    {
        let handle = Handle::from_raw(self.inner.next_handle.fetch_add(1, Ordering::SeqCst));
        let endpoint = Endpoint {
            host: host.to_string(),
            port,
            path: ENDPOINT_PATH.to_string(),
            client_id: client_id.to_string(),
        };
        let events = Arc::new(EventSink::new(
            handle,
            Box::new(on_message),
            Box::new(on_disconnect),
        ));

        let client = match self.inner.factory.create(endpoint.clone(), events.clone()) {
            Ok(client) => client,
            Err(err) => {
                events.disarm();
                warn!("{handle}: could not create client for {endpoint}: {err}");
                return Err(Error::ConnectFailure(err.to_string()));
            }
        };

        self.entries().insert(
            handle,
            Entry {
                client: client.clone(),
                events,
            },
        );
        debug!("{handle}: registered, connecting to {endpoint}");

        let mut guard = ConnectGuard {
            registry: self,
            handle,
            settled: false,
        };

        let (done, pending) = Completion::channel("connect");
        client.connect(ConnectOptions { reconnect: false }, done);

        match pending.wait().await {
            Outcome::Succeeded => {
                guard.settled = true;
                info!("{handle}: connected to {endpoint}");
                Ok(handle)
            }
            Outcome::Failed(reason) => {
                warn!("{handle}: connect to {endpoint} failed: {reason}");
                Err(Error::ConnectFailure(reason))
            }
            Outcome::Abandoned => {
                warn!("{handle}: connect to {endpoint} abandoned by the client");
                Err(Error::ConnectFailure(
                    "handshake abandoned by the messaging client".to_string(),
                ))
            }
        }
    }

    /// Subscribes the connection behind `handle` to `topic`.
    pub async fn subscribe(&self, handle: Handle, topic: &str) -> Result<()> {
        self.request(handle, topic, "subscribe", |client, topic, done| {
            client.subscribe(topic, done)
        })
        .await
    }

    /// Removes the subscription for `topic` from the connection behind
    /// `handle`.
    pub async fn unsubscribe(&self, handle: Handle, topic: &str) -> Result<()> {
        self.request(handle, topic, "unsubscribe", |client, topic, done| {
            client.unsubscribe(topic, done)
        })
        .await
    }

    /// Callback flavour of [`unsubscribe`](Self::unsubscribe): `on_success`
    /// is called exactly once with whether the unsubscribe succeeded.
    ///
    /// The request runs on the current tokio runtime. Without one, the
    /// unsubscribe is not attempted and `on_success(false)` is called
    /// immediately.
    pub fn unsubscribe_with<F>(&self, handle: Handle, topic: impl Into<String>, on_success: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("{handle}: unsubscribe needs a tokio runtime: {err}");
                on_success(false);
                return;
            }
        };

        let registry = self.clone();
        let topic = topic.into();

        runtime.spawn(async move {
            let result = registry.unsubscribe(handle, &topic).await;
            if let Err(err) = &result {
                debug!("{handle}: unsubscribe callback reports failure: {err}");
            }
            on_success(result.is_ok());
        });
    }

    /// Forgets `handle` and disconnects its client.
    ///
    /// Never fails: an unknown handle is ignored and disconnect errors are
    /// logged and discarded. The handle's sink is disarmed first, so the
    /// resulting drop is not reported to the disconnect handler.
    pub fn close(&self, handle: Handle) {
        let Some(entry) = self.entries().remove(&handle) else {
            debug!("{handle}: close on unknown handle ignored");
            return;
        };

        entry.events.disarm();

        if let Err(err) = entry.client.disconnect() {
            warn!("{handle}: disconnect failed (ignored): {err}");
        }

        info!("{handle}: closed");
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn client(&self, handle: Handle) -> Result<Arc<dyn MessagingClient>> {
        self.entries()
            .get(&handle)
            .map(|entry| entry.client.clone())
            .ok_or(Error::UnknownHandle(handle))
    }

    async fn request<F>(&self, handle: Handle, topic: &str, op: &'static str, start: F) -> Result<()>
    where
        F: FnOnce(&dyn MessagingClient, &str, Completion),
    {
        let client = self.client(handle)?;
        let (done, pending) = Completion::channel(op);

        debug!("{handle}: {op} {topic}");
        start(client.as_ref(), topic, done);

        match pending.wait().await {
            Outcome::Succeeded => {
                debug!("{handle}: {op} {topic} acknowledged");
                Ok(())
            }
            Outcome::Failed(reason) => Err(Error::OperationFailure {
                op,
                topic: topic.to_string(),
                reason,
            }),
            Outcome::Abandoned => Err(Error::Abandoned(op)),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.len())
            .field("next_handle", &self.inner.next_handle.load(Ordering::SeqCst))
            .finish()
    }
}

/// Removes a half-open entry unless the connect attempt succeeded.
struct ConnectGuard<'a> {
    registry: &'a Registry,
    handle: Handle,
    settled: bool,
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.close(self.handle);
        }
    }
}
