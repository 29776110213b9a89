//! MQTT over WebSocket, backed by `rumqttc`.
//!
//! One background task per client owns the `EventLoop`:
//! - the first ConnAck settles the connect completion; an error before it
//!   settles the connect as failed
//! - SUBACK / UNSUBACK settle the completions correlated by [`AckTracker`]
//! - incoming publishes go to the handle's [`EventSink`]
//! - an error after the handshake is reported as a connection loss and ends
//!   the task
//!
//! Sessions never redial. A connect asking for `reconnect` is refused.
//!
//! Request methods only enqueue into the `AsyncClient` (`try_*` variants), so
//! none of them block or need to be awaited.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode,
    Transport,
};
use tokio::sync::Notify;
use tracing::{debug, info, trace};

use super::acks::AckTracker;
use crate::client::{
    ClientError, ClientFactory, Completion, ConnectOptions, Endpoint, EventSink, MessagingClient,
};
use crate::config::ClientSettings;

/// Builds [`WebSocketClient`]s from the `client` section of the settings.
#[derive(Debug, Clone, Default)]
pub struct WebSocketClientFactory {
    settings: ClientSettings,
}

impl WebSocketClientFactory {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

impl ClientFactory for WebSocketClientFactory {
    fn create(
        &self,
        endpoint: Endpoint,
        events: Arc<EventSink>,
    ) -> Result<Arc<dyn MessagingClient>, ClientError> {
        let options = mqtt_options(&endpoint, &self.settings)?;
        let (client, event_loop) = AsyncClient::new(options, self.settings.request_capacity.max(1));

        Ok(Arc::new(WebSocketClient {
            endpoint,
            client,
            event_loop: Mutex::new(Some(event_loop)),
            events,
            acks: Arc::new(Mutex::new(AckTracker::default())),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
        }))
    }
}

/// Builds the rumqttc options for `endpoint`.
///
/// rumqttc panics on an empty client id or one starting with a space, so
/// those are rejected here instead.
pub(crate) fn mqtt_options(
    endpoint: &Endpoint,
    settings: &ClientSettings,
) -> Result<MqttOptions, ClientError> {
    if endpoint.client_id.is_empty() || endpoint.client_id.starts_with(' ') {
        return Err(format!("invalid client id '{}'", endpoint.client_id).into());
    }

    // for websockets rumqttc takes the whole URL as the broker address
    let mut options = MqttOptions::new(endpoint.client_id.clone(), endpoint.url(), endpoint.port);
    options.set_transport(Transport::Ws);
    options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
    options.set_clean_session(true);
    Ok(options)
}

/// A single MQTT session over WebSocket.
pub struct WebSocketClient {
    endpoint: Endpoint,
    client: AsyncClient,
    // taken by the first connect
    event_loop: Mutex<Option<EventLoop>>,
    events: Arc<EventSink>,
    acks: Arc<Mutex<AckTracker>>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl WebSocketClient {
    fn acks(&self) -> MutexGuard<'_, AckTracker> {
        lock(&self.acks)
    }
}

fn lock(acks: &Mutex<AckTracker>) -> MutexGuard<'_, AckTracker> {
    acks.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MessagingClient for WebSocketClient {
    fn connect(&self, options: ConnectOptions, done: Completion) {
        if options.reconnect {
            done.fail("automatic reconnection is not supported");
            return;
        }

        let Some(event_loop) = self
            .event_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            done.fail("connect already started for this client");
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                done.fail(format!("no tokio runtime to drive the connection: {err}"));
                return;
            }
        };

        let session = Session {
            name: format!("{}", self.events.handle()),
            event_loop,
            events: self.events.clone(),
            acks: self.acks.clone(),
            connected: self.connected.clone(),
            shutdown: self.shutdown.clone(),
        };

        debug!("{}: starting session for {}", session.name, self.endpoint);
        runtime.spawn(session.run(done));
    }

    fn subscribe(&self, topic: &str, done: Completion) {
        // hold the tracker while enqueueing so completions queue in request order
        let mut acks = self.acks();
        match self.client.try_subscribe(topic, QoS::AtMostOnce) {
            Ok(()) => acks.queue_subscribe(done),
            Err(err) => done.fail(err.to_string()),
        }
    }

    fn unsubscribe(&self, topic: &str, done: Completion) {
        let mut acks = self.acks();
        match self.client.try_unsubscribe(topic) {
            Ok(()) => acks.queue_unsubscribe(done),
            Err(err) => done.fail(err.to_string()),
        }
    }

    fn disconnect(&self) -> Result<(), ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            // still handshaking (or never started): nothing to say goodbye to
            self.shutdown.notify_one();
            return Ok(());
        }

        self.client.try_disconnect().map_err(|err| {
            self.shutdown.notify_one();
            ClientError::from(err)
        })
    }
}

impl std::fmt::Debug for WebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

/// Background task that owns the event loop of one client.
struct Session {
    name: String,
    event_loop: EventLoop,
    events: Arc<EventSink>,
    acks: Arc<Mutex<AckTracker>>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl Session {
    async fn run(mut self, done: Completion) {
        let mut pending_connect = Some(done);

        loop {
            let event = tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!("{}: session stopped", self.name);
                    break;
                }
                event = self.event_loop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    self.connected.store(true, Ordering::SeqCst);
                    if let Some(done) = pending_connect.take() {
                        info!("{}: connected ({:?})", self.name, connack.code);
                        done.succeed();
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.events.message_arrived(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::SubAck(suback))) => {
                    let failure = suback
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                        .then(|| format!("broker rejected subscription: {:?}", suback.return_codes));
                    lock(&self.acks).acknowledge(suback.pkid, failure);
                }
                Ok(Event::Incoming(Packet::UnsubAck(unsuback))) => {
                    lock(&self.acks).acknowledge(unsuback.pkid, None);
                }
                Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => {
                    lock(&self.acks).bind_subscribe(pkid);
                }
                Ok(Event::Outgoing(Outgoing::Unsubscribe(pkid))) => {
                    lock(&self.acks).bind_unsubscribe(pkid);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("{}: disconnect sent", self.name);
                    break;
                }
                Ok(other) => trace!("{}: {other:?}", self.name),
                Err(err) => {
                    self.connected.store(false, Ordering::SeqCst);

                    if let Some(done) = pending_connect.take() {
                        done.fail(err.to_string());
                        break;
                    }

                    debug!("{}: session ended by transport error", self.name);
                    self.events.connection_lost(err.to_string());
                    break;
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        let dropped = lock(&self.acks).abandon_all();
        if dropped > 0 {
            debug!("{}: abandoned {dropped} unacknowledged requests", self.name);
        }
    }
}
