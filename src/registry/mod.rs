//! Connection registry and operation bridge.
//!
//! The registry hands out opaque [`Handle`]s for connections to an MQTT
//! broker and turns each request against a handle (connect, subscribe,
//! unsubscribe, close) into a call on the underlying
//! [`MessagingClient`](crate::client::MessagingClient), resolving the
//! returned future once the client settles the request.
//!
//! Per-handle lifecycle:
//!
//! ```text
//! UNCREATED -> CONNECTING -> CONNECTED -> CLOSED
//!                   |
//!                   +-> FAILED (entry removed, handle never returned)
//! ```
//!
//! A connection loss while CONNECTED is reported to the handle's disconnect
//! handler but does not remove the entry; only `close` does.

pub mod engine;
pub mod handle;

pub use engine::{ENDPOINT_PATH, Registry};
pub use handle::Handle;
