//! Core library for the scanrelay DAQ backup tool.
//!
//! The crate turns completed detector scans into Globus transfer runs. Scan
//! directories are parsed into identities, mapped onto a remote destination
//! layout, submitted through a [`FlowsClient`] and followed until the run
//! ends. Watch mode feeds filesystem notifications through a debouncer so
//! each scan is submitted at most once per process lifetime.

pub mod config;
pub mod debounce;
pub mod flows;
pub mod globus;
pub mod monitor;
pub mod orchestrator;
pub mod path;
pub mod scan;
pub mod submit;
pub mod test_support;
pub mod transfer;
pub mod watch;

pub use config::{ConfigError, RelayConfig};
pub use debounce::{
    CompletionDebouncer, CompletionEvent, FsEventKind, MarkerPatterns, RawFsEvent,
};
pub use flows::{FlowsClient, FlowsFuture, RunHandle, RunState, RunStatus};
pub use globus::{GlobusError, GlobusFlowsClient};
pub use monitor::{MonitorOutcome, PollTransientError, RunMonitor};
pub use orchestrator::{SubmittedTransfer, TransferError, TransferOrchestrator, WatchSummary};
pub use path::PathTranslator;
pub use scan::ScanIdentity;
pub use submit::{SubmissionError, submit};
pub use transfer::{BuildError, TransferRequest, TransferRequestBuilder, TransferSettings};
pub use watch::{FsEventSource, WatchError};
