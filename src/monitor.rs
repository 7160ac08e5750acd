//! Run status reconciliation.
//!
//! [`RunMonitor`] polls a run until it reaches a terminal status, reporting
//! every status transition to the caller. Fetch failures are transient: they
//! are logged and polling resumes after the normal interval, with no retry
//! cap. Operator cancellation and the optional maximum duration end the loop
//! cleanly with a dedicated outcome rather than an error.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::flows::{FlowsClient, RunState};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A status fetch that failed but does not end monitoring.
#[derive(Debug, Error)]
#[error("failed to fetch status of run {run_id}: {source}")]
pub struct PollTransientError<ClientError>
where
    ClientError: std::error::Error + 'static,
{
    /// Run being monitored.
    pub run_id: String,
    /// Client specific cause.
    #[source]
    pub source: ClientError,
}

/// How a monitoring session ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MonitorOutcome {
    /// The run reached a terminal status.
    Finished(RunState),
    /// Monitoring was cancelled by the operator.
    Cancelled {
        /// Last state observed before cancellation.
        last: Option<RunState>,
    },
    /// The configured maximum monitoring duration elapsed.
    TimedOut {
        /// Last state observed before the deadline.
        last: Option<RunState>,
    },
}

impl MonitorOutcome {
    /// Returns the last known state of the run.
    #[must_use]
    pub const fn last_state(&self) -> Option<&RunState> {
        match self {
            Self::Finished(state) => Some(state),
            Self::Cancelled { last } | Self::TimedOut { last } => last.as_ref(),
        }
    }
}

/// Polls run status at a bounded interval.
#[derive(Clone, Debug)]
pub struct RunMonitor {
    poll_interval: Duration,
    max_duration: Option<Duration>,
    cancel: CancellationToken,
}

impl RunMonitor {
    /// Creates a monitor that polls every `poll_interval` with no deadline.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            max_duration: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bounds the total monitoring time of each session.
    ///
    /// A bound too large to represent as a deadline is treated as no bound.
    #[must_use]
    pub const fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Uses `cancel` to stop monitoring on operator request.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the cancellation token observed by this monitor.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Polls `run_id` until it is terminal, cancelled or out of time.
    ///
    /// `on_transition` fires for the first observed state and then whenever
    /// the status differs from the previous observation.
    pub async fn monitor<C, F>(&self, client: &C, run_id: &str, mut on_transition: F) -> MonitorOutcome
    where
        C: FlowsClient + ?Sized,
        F: FnMut(&RunState),
    {
        let deadline = self
            .max_duration
            .and_then(|limit| Instant::now().checked_add(limit));
        let mut last: Option<RunState> = None;

        loop {
            if self.cancel.is_cancelled() {
                return MonitorOutcome::Cancelled { last };
            }

            let fetched = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return MonitorOutcome::Cancelled { last },
                result = client.run_status(run_id) => result,
            };

            match fetched {
                Ok(state) => {
                    let changed = last
                        .as_ref()
                        .is_none_or(|previous| previous.status != state.status);
                    if changed {
                        info!(run_id, status = %state.status, detail = ?state.detail, "run status changed");
                        on_transition(&state);
                    }
                    if state.is_terminal() {
                        return MonitorOutcome::Finished(state);
                    }
                    last = Some(state);
                }
                Err(source) => {
                    let err = PollTransientError {
                        run_id: run_id.to_owned(),
                        source,
                    };
                    warn!(error = %err, "status poll failed; retrying");
                }
            }

            let wait = match deadline {
                Some(limit) => {
                    let now = Instant::now();
                    if now >= limit {
                        return MonitorOutcome::TimedOut { last };
                    }
                    self.poll_interval.min(limit - now)
                }
                None => self.poll_interval,
            };
            debug!(run_id, wait_ms = wait.as_millis(), "waiting before next poll");

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return MonitorOutcome::Cancelled { last },
                () = sleep(wait) => {}
            }

            if deadline.is_some_and(|limit| Instant::now() >= limit) {
                return MonitorOutcome::TimedOut { last };
            }
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
