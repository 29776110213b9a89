use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::client::Completion;

/// Correlates subscribe/unsubscribe completions with MQTT packet ids.
///
/// Requests reach the event loop in the order they were issued, and the event
/// loop reports `Outgoing::Subscribe(pkid)` / `Outgoing::Unsubscribe(pkid)`
/// in that same order, so each queue is bound front-first. The matching
/// SUBACK / UNSUBACK then settles the bound completion.
#[derive(Debug, Default)]
pub(crate) struct AckTracker {
    queued_subscribes: VecDeque<Completion>,
    queued_unsubscribes: VecDeque<Completion>,
    inflight: HashMap<u16, Completion>,
}

impl AckTracker {
    pub(crate) fn queue_subscribe(&mut self, done: Completion) {
        self.queued_subscribes.push_back(done);
    }

    pub(crate) fn queue_unsubscribe(&mut self, done: Completion) {
        self.queued_unsubscribes.push_back(done);
    }

    pub(crate) fn bind_subscribe(&mut self, pkid: u16) {
        match self.queued_subscribes.pop_front() {
            Some(done) => self.bind(pkid, done),
            None => debug!("SUBSCRIBE {pkid} sent with no queued completion"),
        }
    }

    pub(crate) fn bind_unsubscribe(&mut self, pkid: u16) {
        match self.queued_unsubscribes.pop_front() {
            Some(done) => self.bind(pkid, done),
            None => debug!("UNSUBSCRIBE {pkid} sent with no queued completion"),
        }
    }

    fn bind(&mut self, pkid: u16, done: Completion) {
        if let Some(stale) = self.inflight.insert(pkid, done) {
            warn!("packet id {pkid} reused while {} was unacknowledged", stale.op());
            stale.fail(format!("packet id {pkid} reused before acknowledgment"));
        }
    }

    /// Settles the completion bound to `pkid`. Returns false for an
    /// acknowledgment nobody waits for.
    pub(crate) fn acknowledge(&mut self, pkid: u16, failure: Option<String>) -> bool {
        let Some(done) = self.inflight.remove(&pkid) else {
            debug!("acknowledgment for unknown packet id {pkid}");
            return false;
        };

        match failure {
            None => done.succeed(),
            Some(reason) => done.fail(reason),
        }
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.queued_subscribes.len() + self.queued_unsubscribes.len() + self.inflight.len()
    }

    /// Drops every outstanding completion; their callers see them as
    /// abandoned.
    pub(crate) fn abandon_all(&mut self) -> usize {
        let count = self.len();
        self.queued_subscribes.clear();
        self.queued_unsubscribes.clear();
        self.inflight.clear();
        count
    }
}
