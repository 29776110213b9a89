//! The `transport` module provides the production
//! [`ClientFactory`](crate::client::ClientFactory): MQTT 3.1.1 over
//! WebSocket through `rumqttc`.
//!
//! The registry never sees anything from here except the `client` traits;
//! MQTT framing, keep-alives and the socket itself stay inside rumqttc.

mod acks;
pub mod websocket;

pub use websocket::{WebSocketClient, WebSocketClientFactory};
