//! The `error` module defines the error types used within `mqttbind`.
//!
//! Every fallible operation on the registry, the connection wrapper and the
//! configuration loader returns [`Result`]. `close` is the only registry
//! operation that never fails; disconnect errors it observes are logged and
//! discarded.

use thiserror::Error;

use crate::registry::Handle;

#[derive(Error, Debug)]
pub enum Error {
    /// The underlying handshake failed or the client could not be built.
    /// The handle allocated for the attempt never becomes addressable.
    #[error("connect failed: {0}")]
    ConnectFailure(String),

    /// The underlying client acknowledged a subscribe or unsubscribe with a
    /// failure.
    #[error("{op} on '{topic}' failed: {reason}")]
    OperationFailure {
        op: &'static str,
        topic: String,
        reason: String,
    },

    /// The handle is not registered: it was closed, never existed, or its
    /// connect attempt failed.
    #[error("unknown connection handle {0}")]
    UnknownHandle(Handle),

    /// The underlying client dropped an operation without settling it.
    #[error("{0} was abandoned by the messaging client")]
    Abandoned(&'static str),

    /// The scoped connection lost its session and released its handle.
    #[error("disconnected")]
    Disconnected,

    /// A stringified handle could not be parsed.
    #[error("invalid connection handle '{0}'")]
    InvalidHandle(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
