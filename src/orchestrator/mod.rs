//! Orchestrates scan transfers end to end.
//!
//! One-shot mode parses a scan directory, builds its transfer request,
//! submits it and optionally follows the run. Watch mode drains a channel of
//! raw filesystem events through a [`CompletionDebouncer`] and runs the same
//! pipeline for each completed scan on its own task, so slow submissions
//! never hold up event intake. Failures stay local to their scan: they are
//! logged and counted, and the watch loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::debounce::{CompletionDebouncer, CompletionEvent, RawFsEvent};
use crate::flows::{FlowsClient, RunHandle, RunState, RunStatus};
use crate::monitor::{MonitorOutcome, RunMonitor};
use crate::scan::ScanIdentity;
use crate::submit::{SubmissionError, submit};
use crate::transfer::{self, BuildError, TransferRequest, TransferSettings};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Errors surfaced while transferring a scan.
#[derive(Debug, Error)]
pub enum TransferError<ClientError>
where
    ClientError: std::error::Error + 'static,
{
    /// The transfer request could not be built.
    #[error("cannot build transfer request: {0}")]
    Build(#[from] BuildError),
    /// Every submission attempt failed.
    #[error(transparent)]
    Submission(#[from] SubmissionError<ClientError>),
    /// The run itself ended in the `FAILED` state.
    #[error("transfer run {run_id} failed: {detail}")]
    TerminalFailure {
        /// Identifier of the failed run.
        run_id: String,
        /// Detail reported by the workflow service.
        detail: String,
    },
}

/// A scan whose transfer run was accepted by the service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmittedTransfer {
    /// Identity of the transferred scan.
    pub identity: ScanIdentity,
    /// Request that was submitted.
    pub request: TransferRequest,
    /// Handle of the created run.
    pub handle: RunHandle,
}

/// Counters reported when a watch session ends.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WatchSummary {
    /// Completion events emitted by the debouncer.
    pub emitted: usize,
    /// Scans whose transfer run was submitted.
    pub submitted: usize,
    /// Scans dropped because building or submitting failed.
    pub failed: usize,
    /// Followed runs that ended in the `FAILED` state.
    pub runs_failed: usize,
}

enum ScanOutcome {
    Submitted { run_failed: bool },
    Dropped,
}

/// Wires the request builder, submitter and run monitor together.
#[derive(Debug)]
pub struct TransferOrchestrator<C> {
    client: Arc<C>,
    settings: TransferSettings,
    monitor: RunMonitor,
    submit_attempts: u32,
    retry_delay: Duration,
}

impl<C> TransferOrchestrator<C>
where
    C: FlowsClient + 'static,
{
    /// Creates an orchestrator around an authorised client.
    #[must_use]
    pub const fn new(client: Arc<C>, settings: TransferSettings, monitor: RunMonitor) -> Self {
        Self {
            client,
            settings,
            monitor,
            submit_attempts: 1,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Sets the total number of submission attempts per scan.
    ///
    /// Every attempt re-sends the identical request, which carries the scan's
    /// idempotency key as a `scan:` tag, so a duplicate run caused by an
    /// ambiguous failure can be traced back to its scan. Values below one
    /// are treated as one.
    #[must_use]
    pub const fn with_submit_attempts(mut self, attempts: u32) -> Self {
        self.submit_attempts = attempts;
        self
    }

    /// Overrides the pause between submission attempts.
    ///
    /// This is primarily used by tests to keep retry scenarios fast.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Returns the transfer settings in use.
    #[must_use]
    pub const fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Parses, builds and submits the transfer for `scan_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Build`] when the scan path has no experiment
    /// folder and [`TransferError::Submission`] when every attempt fails.
    pub async fn transfer_scan(
        &self,
        scan_dir: &Utf8Path,
    ) -> Result<SubmittedTransfer, TransferError<C::Error>> {
        let identity = ScanIdentity::parse(scan_dir);
        let request = transfer::build(&identity, &self.settings)?;
        let handle = self.submit_with_retry(&request).await?;
        Ok(SubmittedTransfer {
            identity,
            request,
            handle,
        })
    }

    /// Submits a prebuilt request.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Submission`] when every attempt fails.
    pub async fn transfer_request(
        &self,
        request: &TransferRequest,
    ) -> Result<RunHandle, TransferError<C::Error>> {
        Ok(self.submit_with_retry(request).await?)
    }

    /// Follows `run_id` until it ends, reporting status transitions.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::TerminalFailure`] when the run ends in the
    /// `FAILED` state. Cancellation and timeouts are reported through the
    /// returned [`MonitorOutcome`].
    pub async fn follow<F>(
        &self,
        run_id: &str,
        on_transition: F,
    ) -> Result<MonitorOutcome, TransferError<C::Error>>
    where
        F: FnMut(&RunState),
    {
        let outcome = self
            .monitor
            .monitor(self.client.as_ref(), run_id, on_transition)
            .await;
        match outcome {
            MonitorOutcome::Finished(RunState {
                status: RunStatus::Failed,
                detail,
            }) => Err(TransferError::TerminalFailure {
                run_id: run_id.to_owned(),
                detail: detail.unwrap_or_else(|| String::from("no detail provided")),
            }),
            other => Ok(other),
        }
    }

    /// Runs the watch-and-trigger loop until cancellation or until `events`
    /// closes, then waits for in-flight scans to finish.
    ///
    /// Each completion event is handled on its own task. When `follow_runs`
    /// is set the task also monitors the submitted run.
    pub async fn watch(
        self: Arc<Self>,
        mut events: UnboundedReceiver<RawFsEvent>,
        debouncer: &CompletionDebouncer,
        follow_runs: bool,
    ) -> WatchSummary {
        let cancel = self.monitor.cancellation().clone();
        let mut summary = WatchSummary::default();
        let mut tasks: JoinSet<ScanOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("watch cancelled; waiting for in-flight transfers");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    record(&mut summary, joined);
                }
                received = events.recv() => {
                    let Some(raw) = received else {
                        info!("event source closed; waiting for in-flight transfers");
                        break;
                    };
                    if let Some(event) = debouncer.observe(&raw) {
                        summary.emitted += 1;
                        let this = Arc::clone(&self);
                        tasks.spawn(async move { this.handle_completion(event, follow_runs).await });
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record(&mut summary, joined);
        }
        info!(
            emitted = summary.emitted,
            submitted = summary.submitted,
            failed = summary.failed,
            runs_failed = summary.runs_failed,
            "watch finished"
        );
        summary
    }

    async fn handle_completion(&self, event: CompletionEvent, follow_runs: bool) -> ScanOutcome {
        info!(
            scan_directory = %event.scan_directory,
            marker = %event.marker,
            "scan completion detected"
        );
        let scan = match self.transfer_scan(&event.scan_directory).await {
            Ok(scan) => scan,
            Err(err) => {
                error!(scan_directory = %event.scan_directory, error = %err, "dropping scan");
                return ScanOutcome::Dropped;
            }
        };
        info!(
            scan = %scan.identity,
            run_id = %scan.handle.run_id,
            url = %scan.handle.monitor_url(),
            "transfer started"
        );

        if !follow_runs {
            return ScanOutcome::Submitted { run_failed: false };
        }
        match self.follow(&scan.handle.run_id, |_| {}).await {
            Ok(outcome) => {
                if let Some(state) = outcome.last_state() {
                    info!(run_id = %scan.handle.run_id, state = %state, "stopped following run");
                }
                ScanOutcome::Submitted { run_failed: false }
            }
            Err(err) => {
                error!(scan = %scan.identity, error = %err, "transfer run failed");
                ScanOutcome::Submitted { run_failed: true }
            }
        }
    }

    async fn submit_with_retry(
        &self,
        request: &TransferRequest,
    ) -> Result<RunHandle, SubmissionError<C::Error>> {
        let attempts = self.submit_attempts.max(1);
        let mut attempt = 1;
        loop {
            match submit(self.client.as_ref(), request).await {
                Ok(handle) => return Ok(handle),
                Err(err) if attempt < attempts && !self.monitor.cancellation().is_cancelled() => {
                    warn!(attempt, attempts, label = %request.label, error = %err, "retrying submission");
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn record(summary: &mut WatchSummary, joined: Result<ScanOutcome, JoinError>) {
    match joined {
        Ok(ScanOutcome::Submitted { run_failed }) => {
            summary.submitted += 1;
            if run_failed {
                summary.runs_failed += 1;
            }
        }
        Ok(ScanOutcome::Dropped) => summary.failed += 1,
        Err(err) => {
            error!(error = %err, "transfer task aborted");
            summary.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests;
