//! Scoped connections.
//!
//! [`Connection`] owns one registry handle for as long as it lives: dropping
//! it closes the handle, and a connection loss closes it too, after which
//! every request fails with [`Error::Disconnected`]. Use the
//! [`Registry`] directly when handles have to outlive a single owner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::registry::{Handle, Registry};
use crate::utils::error::{Error, Result};

#[derive(Debug, Default)]
struct State {
    handle: Option<Handle>,
    lost: bool,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct Connection {
    registry: Registry,
    state: Arc<Mutex<State>>,
}

impl Connection {
    /// Connects through `registry` and wraps the resulting handle.
    ///
    /// `on_disconnect` runs once, after the handle has been released, if the
    /// session is lost without this connection being dropped.
    pub async fn open<M, D>(
        registry: &Registry,
        host: &str,
        port: u16,
        client_id: &str,
        on_message: M,
        on_disconnect: D,
    ) -> Result<Connection>
    where
        M: FnMut(String, String) + Send + 'static,
        D: FnOnce(String) + Send + 'static,
    {
        let state = Arc::new(Mutex::new(State::default()));

        let on_lost = {
            let registry = registry.clone();
            let state = state.clone();
            move |reason: String| {
                let handle = {
                    let mut state = lock(&state);
                    state.lost = true;
                    state.handle.take()
                };
                if let Some(handle) = handle {
                    registry.close(handle);
                }
                on_disconnect(reason);
            }
        };

        let handle = registry
            .connect(host, port, client_id, on_lost, on_message)
            .await?;

        let lost = {
            let mut state = lock(&state);
            if !state.lost {
                state.handle = Some(handle);
            }
            state.lost
        };
        if lost {
            debug!("{handle}: lost during handshake, releasing");
            registry.close(handle);
        }

        Ok(Connection {
            registry: registry.clone(),
            state,
        })
    }

    /// The wrapped handle, or `None` once the session was lost.
    pub fn handle(&self) -> Option<Handle> {
        lock(&self.state).handle
    }

    pub fn is_connected(&self) -> bool {
        self.handle().is_some()
    }

    fn current(&self) -> Result<Handle> {
        self.handle().ok_or(Error::Disconnected)
    }

    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        let handle = self.current()?;
        self.registry.subscribe(handle, topic).await
    }

    pub async fn unsubscribe(&self, topic: &str) -> Result<()> {
        let handle = self.current()?;
        self.registry.unsubscribe(handle, topic).await
    }

    /// Closes the connection now rather than at the end of the scope.
    pub fn close(self) {}
}

impl Drop for Connection {
    fn drop(&mut self) {
        let handle = lock(&self.state).handle.take();
        if let Some(handle) = handle {
            self.registry.close(handle);
        }
    }
}
