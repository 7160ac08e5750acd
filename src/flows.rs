//! Client abstraction for the remote workflow-orchestration service.
//!
//! The pipeline never authenticates on its own: callers construct an
//! authorised [`FlowsClient`] once and hand it to the submitter and the run
//! monitor explicitly.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::transfer::TransferRequest;

/// Web console address used to follow a run interactively.
pub const RUN_CONSOLE_URL: &str = "https://app.globus.org/runs";

/// Handle returned once the service has accepted a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunHandle {
    /// Opaque run identifier assigned by the service.
    pub run_id: String,
    /// Time at which the submission was acknowledged.
    pub submitted_at: DateTime<Utc>,
}

impl RunHandle {
    /// Creates a handle stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Returns the web console URL for this run.
    #[must_use]
    pub fn monitor_url(&self) -> String {
        format!("{RUN_CONSOLE_URL}/{}", self.run_id)
    }
}

/// Lifecycle status reported for a run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RunStatus {
    /// The run is still executing.
    Active,
    /// The run completed successfully.
    Succeeded,
    /// The run failed.
    Failed,
    /// The run stopped without completing, for example after a cancellation
    /// or an expired consent.
    Inactive,
}

impl RunStatus {
    /// Returns whether no further transitions are expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Parses a status string reported by the service.
    ///
    /// Unrecognised values are treated as [`RunStatus::Active`] so that
    /// polling continues until a known terminal status appears.
    #[must_use]
    pub fn from_service(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "INACTIVE" => Self::Inactive,
            _ => Self::Active,
        }
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a run: status plus optional service-provided detail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunState {
    /// Lifecycle status.
    pub status: RunStatus,
    /// Free-text detail, such as the description of the current step.
    pub detail: Option<String>,
}

impl RunState {
    /// Creates a state without detail.
    #[must_use]
    pub const fn new(status: RunStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    /// Attaches detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Returns whether the run has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Future returned by client operations.
pub type FlowsFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Authorised handle on the workflow service.
pub trait FlowsClient: Send + Sync {
    /// Service specific error type returned by the client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Starts a transfer run for `request`.
    fn submit_run<'a>(
        &'a self,
        request: &'a TransferRequest,
    ) -> FlowsFuture<'a, RunHandle, Self::Error>;

    /// Fetches the current state of the run `run_id`.
    fn run_status<'a>(&'a self, run_id: &'a str) -> FlowsFuture<'a, RunState, Self::Error>;
}
