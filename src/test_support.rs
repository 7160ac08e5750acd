//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::flows::{FlowsClient, FlowsFuture, RunHandle, RunState};
use crate::transfer::TransferRequest;

/// Failures produced by [`ScriptedFlowsClient`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedFlowsError {
    /// Simulated connectivity failure.
    #[error("simulated network failure")]
    Network,
    /// Simulated rejection by the service.
    #[error("simulated rejection: {0}")]
    Rejected(String),
    /// No scripted response was queued.
    #[error("no scripted response available")]
    Exhausted,
}

#[derive(Debug, Default)]
struct ScriptState {
    submit_responses: VecDeque<Result<String, ScriptedFlowsError>>,
    status_responses: VecDeque<Result<RunState, ScriptedFlowsError>>,
    last_status: Option<RunState>,
    submitted: Vec<TransferRequest>,
    status_calls: usize,
}

/// Scripted workflow client that returns pre-seeded responses in FIFO order.
///
/// Once the status queue is drained the most recent successful state is
/// replayed, which keeps long-running monitors in a stable state.
#[derive(Clone, Debug, Default)]
pub struct ScriptedFlowsClient {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedFlowsClient {
    /// Creates a client with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Queues a successful submission returning `run_id`.
    pub fn push_submit_ok(&self, run_id: impl Into<String>) {
        let id = run_id.into();
        self.with_state(|state| state.submit_responses.push_back(Ok(id)));
    }

    /// Queues a failed submission.
    pub fn push_submit_err(&self, err: ScriptedFlowsError) {
        self.with_state(|state| state.submit_responses.push_back(Err(err)));
    }

    /// Queues a status observation.
    pub fn push_status(&self, run_state: RunState) {
        self.with_state(|state| state.status_responses.push_back(Ok(run_state)));
    }

    /// Queues a failed status fetch.
    pub fn push_status_err(&self, err: ScriptedFlowsError) {
        self.with_state(|state| state.status_responses.push_back(Err(err)));
    }

    /// Returns every request submitted so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<TransferRequest> {
        self.with_state(|state| state.submitted.clone())
    }

    /// Returns how many status fetches were made.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.with_state(|state| state.status_calls)
    }
}

impl FlowsClient for ScriptedFlowsClient {
    type Error = ScriptedFlowsError;

    fn submit_run<'a>(
        &'a self,
        request: &'a TransferRequest,
    ) -> FlowsFuture<'a, RunHandle, Self::Error> {
        Box::pin(async move {
            self.with_state(|state| {
                state.submitted.push(request.clone());
                state
                    .submit_responses
                    .pop_front()
                    .unwrap_or(Err(ScriptedFlowsError::Exhausted))
            })
            .map(RunHandle::new)
        })
    }

    fn run_status<'a>(&'a self, _run_id: &'a str) -> FlowsFuture<'a, RunState, Self::Error> {
        Box::pin(async move {
            self.with_state(|state| {
                state.status_calls += 1;
                match state.status_responses.pop_front() {
                    Some(Ok(run_state)) => {
                        state.last_status = Some(run_state.clone());
                        Ok(run_state)
                    }
                    Some(Err(err)) => Err(err),
                    None => state.last_status.clone().ok_or(ScriptedFlowsError::Exhausted),
                }
            })
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    ///
    /// Pairs with a `None` value are removed for the lifetime of the guard.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
