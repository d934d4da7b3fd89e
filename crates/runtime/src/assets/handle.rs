//! Completion handle for an asynchronous bundle load.

use std::sync::Arc;

use parking_lot::Mutex;

/// How a bundle load ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Completed,
    /// The load was cancelled; callers treat this like completion.
    Cancelled,
    Failed(String),
}

type CompletionCallback = Box<dyn FnOnce(LoadOutcome) + Send>;

enum HandleState {
    Pending(Option<CompletionCallback>),
    Done(LoadOutcome),
}

/// Shared handle to an in-flight or finished bundle load.
///
/// The loader resolves it once; a bound callback fires exactly once, either
/// at resolution or immediately when bound to an already resolved handle.
#[derive(Clone)]
pub struct LoadHandle {
    state: Arc<Mutex<HandleState>>,
}

impl LoadHandle {
    pub fn pending() -> Self {
        Self {
            state: Arc::new(Mutex::new(HandleState::Pending(None))),
        }
    }

    /// A handle for assets that were already resident.
    pub fn completed() -> Self {
        Self::resolved(LoadOutcome::Completed)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::resolved(LoadOutcome::Failed(reason.into()))
    }

    fn resolved(outcome: LoadOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(HandleState::Done(outcome))),
        }
    }

    /// The outcome if the load has finished.
    pub fn outcome(&self) -> Option<LoadOutcome> {
        match &*self.state.lock() {
            HandleState::Done(outcome) => Some(outcome.clone()),
            HandleState::Pending(_) => None,
        }
    }

    pub fn has_load_completed(&self) -> bool {
        matches!(&*self.state.lock(), HandleState::Done(LoadOutcome::Completed))
    }

    /// Calls `callback` with the outcome: now if resolved, otherwise on
    /// resolution. Binding again replaces an earlier pending callback.
    pub fn bind_completion(&self, callback: impl FnOnce(LoadOutcome) + Send + 'static) {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                HandleState::Done(outcome) => outcome.clone(),
                HandleState::Pending(slot) => {
                    *slot = Some(Box::new(callback));
                    return;
                }
            }
        };
        callback(outcome);
    }

    /// Resolves the handle. Returns `false` if it was already resolved.
    pub fn resolve(&self, outcome: LoadOutcome) -> bool {
        let callback = {
            let mut state = self.state.lock();
            match &mut *state {
                HandleState::Done(_) => return false,
                HandleState::Pending(slot) => {
                    let callback = slot.take();
                    *state = HandleState::Done(outcome.clone());
                    callback
                }
            }
        };
        if let Some(callback) = callback {
            callback(outcome);
        }
        true
    }

    pub fn complete(&self) -> bool {
        self.resolve(LoadOutcome::Completed)
    }

    pub fn cancel(&self) -> bool {
        self.resolve(LoadOutcome::Cancelled)
    }

    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.resolve(LoadOutcome::Failed(reason.into()))
    }
}

impl std::fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadHandle")
            .field("outcome", &self.outcome())
            .finish()
    }
}
