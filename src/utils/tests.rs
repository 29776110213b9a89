use super::error::Error;
use super::logging;
use crate::registry::Handle;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_maps_names() {
    assert_eq!(logging::parse_level("ERROR"), tracing::Level::ERROR);
    assert_eq!(logging::parse_level("warning"), tracing::Level::WARN);
    assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("nonsense"), tracing::Level::INFO);
}

#[test]
fn error_messages_name_the_failure() {
    let err = Error::UnknownHandle(Handle::from_raw(7));
    assert_eq!(err.to_string(), "unknown connection handle 7");

    let err = Error::OperationFailure {
        op: "subscribe",
        topic: "sensors/#".to_string(),
        reason: "not authorized".to_string(),
    };
    assert_eq!(err.to_string(), "subscribe on 'sensors/#' failed: not authorized");
}
