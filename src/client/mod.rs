//! The `client` module defines the capability the registry drives: an
//! MQTT-capable messaging client that reports the outcome of every request
//! through a callback instead of a return value.
//!
//! - [`MessagingClient`] / [`ClientFactory`]: the collaborator seam. The
//!   production implementation lives in `transport`.
//! - [`Completion`]: the single-use callback handed to each request.
//! - [`EventSink`]: where a client reports inbound messages and connection
//!   loss for the handle it was created for.

mod completion;
mod events;

use std::fmt;
use std::sync::Arc;

pub use completion::{Completion, Outcome, PendingOutcome};
pub use events::{DisconnectHandler, EventSink, MessageHandler};

/// Error type reported synchronously by a client (construction, disconnect).
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Where an underlying client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Path segment of the WebSocket URL, for example `/mqtt`.
    pub path: String,
    pub client_id: String,
}

impl Endpoint {
    /// The WebSocket URL for this endpoint.
    pub fn url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("ws://{}:{}/{}", self.host, self.port, path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {}", self.url(), self.client_id)
    }
}

/// Options for the connect handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectOptions {
    /// Whether the client should redial on its own after a drop. The
    /// registry always passes `false`, and the WebSocket client refuses
    /// `true`.
    pub reconnect: bool,
}

/// An asynchronous messaging client bound to one endpoint.
///
/// Request methods return immediately; their outcome is reported later by
/// settling the supplied [`Completion`]. An implementation must settle every
/// completion at most once (the type enforces that) and should settle it
/// exactly once; a completion dropped unsettled is seen by the caller as
/// abandoned.
pub trait MessagingClient: Send + Sync {
    /// Starts the handshake.
    fn connect(&self, options: ConnectOptions, done: Completion);

    fn subscribe(&self, topic: &str, done: Completion);

    fn unsubscribe(&self, topic: &str, done: Completion);

    /// Severs the session. Must not report the resulting drop as a
    /// connection loss if the sink has been disarmed.
    fn disconnect(&self) -> Result<(), ClientError>;
}

/// Builds clients. The factory receives the handle's event sink so inbound
/// events can be delivered from the moment the client exists.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        endpoint: Endpoint,
        events: Arc<EventSink>,
    ) -> Result<Arc<dyn MessagingClient>, ClientError>;
}

#[cfg(test)]
mod tests;
