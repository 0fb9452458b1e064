use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::backend::Session;
use crate::error::{InitError, NodeError, NodeResult, NodeState};

/// Published outcome of one initialization attempt; `None` while it runs.
pub(crate) type Outcome = Option<Result<(), InitError>>;

enum Lifecycle {
    Uninitialized,
    Initializing(watch::Receiver<Outcome>),
    Ready(Session),
    Failed(InitError),
    Disconnected,
}

impl Lifecycle {
    fn state(&self) -> NodeState {
        match self {
            Self::Uninitialized => NodeState::Uninitialized,
            Self::Initializing(_) => NodeState::Initializing,
            Self::Ready(_) => NodeState::Ready,
            Self::Failed(_) => NodeState::Failed,
            Self::Disconnected => NodeState::Disconnected,
        }
    }
}

/// What a caller of `initialize` must do next.
pub(crate) enum Step<'a> {
    /// Already ready.
    Done,
    /// Another caller is bootstrapping; await its outcome.
    Wait(watch::Receiver<Outcome>),
    /// This caller runs the bootstrap and must complete the attempt.
    Run(Attempt<'a>),
}

/// The lifecycle cell. The mutex is only held for state transitions, never
/// across an `.await`.
pub(crate) struct LifecycleCell {
    inner: Mutex<Lifecycle>,
}

impl LifecycleCell {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> NodeState {
        self.lock().state()
    }

    /// Error from the most recent failed attempt, if the node is `Failed`.
    pub(crate) fn last_error(&self) -> Option<InitError> {
        match &*self.lock() {
            Lifecycle::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    pub(crate) fn begin(&self) -> NodeResult<Step<'_>> {
        let mut state = self.lock();
        match &*state {
            Lifecycle::Ready(_) => return Ok(Step::Done),
            Lifecycle::Initializing(rx) => return Ok(Step::Wait(rx.clone())),
            Lifecycle::Disconnected => {
                return Err(precondition("initialize", NodeState::Disconnected))
            }
            Lifecycle::Uninitialized | Lifecycle::Failed(_) => {}
        }
        let (tx, rx) = watch::channel(None);
        *state = Lifecycle::Initializing(rx);
        Ok(Step::Run(Attempt {
            cell: self,
            tx: Some(tx),
        }))
    }

    /// The ready session, or a precondition error naming `operation`.
    pub(crate) fn session(&self, operation: &'static str) -> NodeResult<Session> {
        match &*self.lock() {
            Lifecycle::Ready(session) => Ok(session.clone()),
            other => Err(precondition(operation, other.state())),
        }
    }

    /// Move `Ready` to `Disconnected`, handing back the session to release.
    pub(crate) fn disconnect(&self) -> NodeResult<Session> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, Lifecycle::Disconnected) {
            Lifecycle::Ready(session) => Ok(session),
            other => {
                let current = other.state();
                *state = other;
                Err(precondition("disconnect", current))
            }
        }
    }
}

/// One running initialization attempt.
///
/// Dropping an attempt without completing it marks the node `Failed` with
/// [`InitError::Aborted`] and releases every waiter with that error.
pub(crate) struct Attempt<'a> {
    cell: &'a LifecycleCell,
    tx: Option<watch::Sender<Outcome>>,
}

impl Attempt<'_> {
    pub(crate) fn complete(mut self, outcome: Result<Session, InitError>) -> Result<(), InitError> {
        let result = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
        *self.cell.lock() = match outcome {
            Ok(session) => Lifecycle::Ready(session),
            Err(e) => Lifecycle::Failed(e),
        };
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(result.clone()));
        }
        result
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            {
                let mut state = self.cell.lock();
                if matches!(*state, Lifecycle::Initializing(_)) {
                    *state = Lifecycle::Failed(InitError::Aborted);
                }
            }
            tx.send_replace(Some(Err(InitError::Aborted)));
        }
    }
}

/// Await the outcome published by another caller's attempt.
pub(crate) async fn wait(mut rx: watch::Receiver<Outcome>) -> Result<(), InitError> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone().unwrap_or(Err(InitError::Aborted)),
        Err(_) => Err(InitError::Aborted),
    }
}

fn precondition(operation: &'static str, state: NodeState) -> NodeError {
    NodeError::Precondition { operation, state }
}
