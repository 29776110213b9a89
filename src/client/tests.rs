use std::sync::{Arc, Mutex};

use super::{Completion, ConnectOptions, Endpoint, EventSink, Outcome};
use crate::registry::Handle;

fn recording_sink() -> (
    EventSink,
    Arc<Mutex<Vec<(String, String)>>>,
    Arc<Mutex<Vec<String>>>,
) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let losses = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let messages = messages.clone();
        let losses = losses.clone();
        EventSink::new(
            Handle::from_raw(3),
            Box::new(move |topic, payload| messages.lock().unwrap().push((topic, payload))),
            Box::new(move |reason| losses.lock().unwrap().push(reason)),
        )
    };
    (sink, messages, losses)
}

#[test]
fn endpoint_url_has_single_slash_before_path() {
    let endpoint = Endpoint {
        host: "broker.example".to_string(),
        port: 8083,
        path: "/mqtt".to_string(),
        client_id: "client-A".to_string(),
    };
    assert_eq!(endpoint.url(), "ws://broker.example:8083/mqtt");
    assert_eq!(endpoint.to_string(), "ws://broker.example:8083/mqtt as client-A");
}

#[test]
fn connect_options_default_to_no_reconnect() {
    assert!(!ConnectOptions::default().reconnect);
}

#[tokio::test]
async fn completion_reports_success() {
    let (done, pending) = Completion::channel("subscribe");
    assert_eq!(done.op(), "subscribe");
    done.succeed();
    assert_eq!(pending.wait().await, Outcome::Succeeded);
}

#[tokio::test]
async fn completion_reports_failure_reason() {
    let (done, pending) = Completion::channel("unsubscribe");
    done.fail("refused");
    assert_eq!(pending.wait().await, Outcome::Failed("refused".to_string()));
}

#[tokio::test]
async fn dropped_completion_is_abandoned() {
    let (done, pending) = Completion::channel("connect");
    drop(done);
    assert_eq!(pending.wait().await, Outcome::Abandoned);
}

#[test]
fn settling_after_waiter_is_gone_does_not_panic() {
    let (done, pending) = Completion::channel("subscribe");
    drop(pending);
    done.succeed();
}

#[test]
fn sink_decodes_payload_as_text() {
    let (sink, messages, _) = recording_sink();
    sink.message_arrived("t/1", b"hello");
    sink.message_arrived("t/2", &[0x66, 0x6f, 0xff]);

    let messages = messages.lock().unwrap();
    assert_eq!(messages[0], ("t/1".to_string(), "hello".to_string()));
    assert_eq!(messages[1], ("t/2".to_string(), "fo\u{fffd}".to_string()));
}

#[test]
fn disconnect_handler_fires_once() {
    let (sink, _, losses) = recording_sink();
    sink.connection_lost("socket closed");
    sink.connection_lost("socket closed again");

    assert_eq!(*losses.lock().unwrap(), vec!["socket closed".to_string()]);
    assert!(sink.is_armed());
}

#[test]
fn disarmed_sink_drops_everything() {
    let (sink, messages, losses) = recording_sink();
    assert!(sink.disarm());
    assert!(!sink.disarm());

    sink.message_arrived("t/1", b"late");
    sink.connection_lost("closed by us");

    assert!(messages.lock().unwrap().is_empty());
    assert!(losses.lock().unwrap().is_empty());
}
