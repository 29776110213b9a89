//! Scripted in-memory messaging client for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{
    ClientError, ClientFactory, Completion, ConnectOptions, Endpoint, EventSink, MessagingClient,
};
use crate::registry::Handle;

/// How the fake answers one kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject,
    /// Keep the completion until the test releases it.
    Hold,
    /// Drop the completion unsettled.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect { reconnect: bool },
    Subscribe(String),
    Unsubscribe(String),
    Disconnect,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub connect: Reply,
    pub subscribe: Reply,
    pub unsubscribe: Reply,
    pub fail_create: bool,
    pub fail_disconnect: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            connect: Reply::Accept,
            subscribe: Reply::Accept,
            unsubscribe: Reply::Accept,
            fail_create: false,
            fail_disconnect: false,
        }
    }
}

pub struct FakeClient {
    pub endpoint: Endpoint,
    pub events: Arc<EventSink>,
    script: Arc<Mutex<Script>>,
    calls: Mutex<Vec<Call>>,
    held: Mutex<Vec<Completion>>,
}

impl FakeClient {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn held(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Settles every held completion.
    pub fn release(&self, ok: bool) {
        let held: Vec<Completion> = self.held.lock().unwrap().drain(..).collect();
        for done in held {
            if ok {
                done.succeed();
            } else {
                done.fail("released as failure");
            }
        }
    }

    pub fn deliver(&self, topic: &str, payload: &str) {
        self.events.message_arrived(topic, payload.as_bytes());
    }

    pub fn drop_connection(&self, reason: &str) {
        self.events.connection_lost(reason);
    }

    fn answer(&self, call: Call, reply: Reply, done: Completion) {
        self.calls.lock().unwrap().push(call);
        match reply {
            Reply::Accept => done.succeed(),
            Reply::Reject => {
                let reason = format!("{} refused by broker", done.op());
                done.fail(reason);
            }
            Reply::Hold => self.held.lock().unwrap().push(done),
            Reply::Discard => drop(done),
        }
    }
}

impl MessagingClient for FakeClient {
    fn connect(&self, options: ConnectOptions, done: Completion) {
        let reply = self.script.lock().unwrap().connect;
        self.answer(
            Call::Connect {
                reconnect: options.reconnect,
            },
            reply,
            done,
        );
    }

    fn subscribe(&self, topic: &str, done: Completion) {
        let reply = self.script.lock().unwrap().subscribe;
        self.answer(Call::Subscribe(topic.to_string()), reply, done);
    }

    fn unsubscribe(&self, topic: &str, done: Completion) {
        let reply = self.script.lock().unwrap().unsubscribe;
        self.answer(Call::Unsubscribe(topic.to_string()), reply, done);
    }

    fn disconnect(&self) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::Disconnect);
        // the broker side notices the drop; the sink decides whether it counts
        self.events.connection_lost("client disconnected");
        if self.script.lock().unwrap().fail_disconnect {
            return Err("socket already gone".into());
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    script: Arc<Mutex<Script>>,
    clients: Arc<Mutex<Vec<Arc<FakeClient>>>>,
}

impl FakeFactory {
    pub fn script(&self, edit: impl FnOnce(&mut Script)) {
        edit(&mut self.script.lock().unwrap());
    }

    pub fn created(&self) -> usize {
        self.clients.lock().unwrap().len()
    }

    pub fn client_for(&self, handle: Handle) -> Arc<FakeClient> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|client| client.events.handle() == handle)
            .cloned()
            .unwrap_or_else(|| panic!("no client created for handle {handle}"))
    }

    /// Waits until the client for `handle` holds `count` completions.
    pub async fn wait_for_held(&self, handle: Handle, count: usize) -> Arc<FakeClient> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let found = self
                    .clients
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|client| client.events.handle() == handle)
                    .cloned();
                if let Some(client) = found {
                    if client.held() >= count {
                        return client;
                    }
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("completion was never handed to the fake client")
    }
}

impl ClientFactory for FakeFactory {
    fn create(
        &self,
        endpoint: Endpoint,
        events: Arc<EventSink>,
    ) -> Result<Arc<dyn MessagingClient>, ClientError> {
        if self.script.lock().unwrap().fail_create {
            return Err(format!("cannot reach {}", endpoint.url()).into());
        }

        let client = Arc::new(FakeClient {
            endpoint,
            events,
            script: self.script.clone(),
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        });
        self.clients.lock().unwrap().push(client.clone());
        Ok(client)
    }
}

/// Collects what a handle's handlers received.
#[derive(Clone, Default)]
pub struct Recorder {
    pub messages: Arc<Mutex<Vec<(String, String)>>>,
    pub losses: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn on_message(&self) -> impl FnMut(String, String) + Send + 'static {
        let messages = self.messages.clone();
        move |topic, payload| messages.lock().unwrap().push((topic, payload))
    }

    pub fn on_disconnect(&self) -> impl FnOnce(String) + Send + 'static {
        let losses = self.losses.clone();
        move |reason| losses.lock().unwrap().push(reason)
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn losses(&self) -> Vec<String> {
        self.losses.lock().unwrap().clone()
    }
}
