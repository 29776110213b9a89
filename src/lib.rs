//! # mqttbind
//!
//! `mqttbind` exposes a handle-based interface over an asynchronous MQTT
//! client speaking MQTT over WebSocket. Callers get opaque [`Handle`]s for
//! connections and issue connect, subscribe, unsubscribe and close requests
//! against them; each request resolves exactly once with the outcome the
//! underlying client reports.
//!
//! ## Core Modules
//!
//! - `registry`: the handle registry and operation bridge.
//! - `client`: the callback-driven client capability the registry drives.
//! - `transport`: the `rumqttc` implementation of that capability.
//! - `connection`: a scoped wrapper that closes its handle on drop.
//! - `config`: loading settings from files and the environment.
//! - `utils`: the error type and logging bootstrap.
//!
//! ```no_run
//! use mqttbind::{Registry, WebSocketClientFactory};
//!
//! # async fn run() -> mqttbind::Result<()> {
//! let registry = Registry::new(WebSocketClientFactory::default());
//! let handle = registry
//!     .connect(
//!         "broker.example",
//!         8083,
//!         "client-A",
//!         |reason| eprintln!("lost: {reason}"),
//!         |topic, payload| println!("{topic}: {payload}"),
//!     )
//!     .await?;
//! registry.subscribe(handle, "sensors/#").await?;
//! registry.close(handle);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod registry;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::Connection;
pub use registry::{Handle, Registry};
pub use transport::WebSocketClientFactory;
pub use utils::error::{Error, Result};
