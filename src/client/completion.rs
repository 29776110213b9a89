use tokio::sync::oneshot;
use tracing::debug;

/// Terminal outcome of one bridged request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    /// The completion was dropped without being settled.
    Abandoned,
}

/// Single-use callback for one request against a messaging client.
///
/// `succeed` and `fail` consume the completion, so an operation can only be
/// settled once. If the waiting side has gone away the outcome is discarded.
#[derive(Debug)]
pub struct Completion {
    op: &'static str,
    tx: oneshot::Sender<Result<(), String>>,
}

/// Waiting side of a [`Completion`].
#[derive(Debug)]
pub struct PendingOutcome {
    op: &'static str,
    rx: oneshot::Receiver<Result<(), String>>,
}

impl Completion {
    /// Creates a completion for the operation named `op` together with the
    /// future-like half that observes it.
    pub fn channel(op: &'static str) -> (Completion, PendingOutcome) {
        let (tx, rx) = oneshot::channel();
        (Completion { op, tx }, PendingOutcome { op, rx })
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn succeed(self) {
        self.settle(Ok(()));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.settle(Err(reason.into()));
    }

    fn settle(self, result: Result<(), String>) {
        if self.tx.send(result).is_err() {
            debug!("{} settled after its caller went away; outcome dropped", self.op);
        }
    }
}

impl PendingOutcome {
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Waits until the completion is settled or dropped.
    pub async fn wait(self) -> Outcome {
        match self.rx.await {
            Ok(Ok(())) => Outcome::Succeeded,
            Ok(Err(reason)) => Outcome::Failed(reason),
            Err(_) => Outcome::Abandoned,
        }
    }
}
