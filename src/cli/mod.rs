//! Command-line interface definitions for the `scanrelay` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `scanrelay` binary.
#[derive(Debug, Parser)]
#[command(
    name = "scanrelay",
    about = "Back up completed detector scans through a Globus transfer flow",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Transfer one completed scan directory.
    #[command(name = "submit", about = "Transfer one completed scan directory")]
    Submit(SubmitCommand),
    /// Transfer explicit collection paths.
    #[command(name = "run", about = "Transfer explicit collection paths")]
    Run(RunCommand),
    /// Watch a directory tree and transfer scans as they complete.
    #[command(
        name = "watch",
        about = "Watch a directory tree and transfer scans as they complete"
    )]
    Watch(WatchCommand),
    /// Follow an existing transfer run until it ends.
    #[command(name = "monitor", about = "Follow an existing transfer run until it ends")]
    Monitor(MonitorCommand),
}

/// Overrides for the configured flow and collections.
#[derive(Debug, Default, Args)]
pub(crate) struct FlowArgs {
    /// Override the transfer flow UUID.
    #[arg(long, value_name = "UUID")]
    pub(crate) flow_id: Option<String>,
    /// Override the source collection UUID.
    #[arg(long, value_name = "UUID")]
    pub(crate) source_collection: Option<String>,
    /// Override the destination collection UUID.
    #[arg(long, value_name = "UUID")]
    pub(crate) dest_collection: Option<String>,
    /// Override the root of the destination layout.
    #[arg(long, value_name = "PATH")]
    pub(crate) dest_base_path: Option<String>,
    /// Override the seconds between run status polls.
    #[arg(long, value_name = "SECS")]
    pub(crate) poll_interval: Option<u64>,
}

/// Arguments for the `scanrelay submit` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SubmitCommand {
    /// Completed scan directory on the local DAQ mount.
    #[arg(long, value_name = "DIR")]
    pub(crate) scan_dir: String,
    /// Label for the run instead of `Auto Transfer: <scan>`.
    #[arg(long, value_name = "LABEL")]
    pub(crate) label: Option<String>,
    /// Follow the run until it reaches a terminal status.
    #[arg(long)]
    pub(crate) monitor: bool,
    #[command(flatten)]
    pub(crate) flow: FlowArgs,
}

/// Arguments for the `scanrelay run` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct RunCommand {
    /// Source path on the source collection.
    #[arg(long, value_name = "PATH")]
    pub(crate) source_path: String,
    /// Destination path on the destination collection.
    #[arg(long, value_name = "PATH")]
    pub(crate) dest_path: String,
    /// Label for the run instead of `Auto Transfer: <source>`.
    #[arg(long, value_name = "LABEL")]
    pub(crate) label: Option<String>,
    /// Follow the run until it reaches a terminal status.
    #[arg(long)]
    pub(crate) monitor: bool,
    #[command(flatten)]
    pub(crate) flow: FlowArgs,
}

/// Arguments for the `scanrelay watch` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct WatchCommand {
    /// Directory tree to watch for completion markers.
    #[arg(long, value_name = "DIR")]
    pub(crate) watch_dir: String,
    /// Marker file suffix; repeat for several. Defaults to `.done` and
    /// `.complete`.
    #[arg(long = "marker", value_name = "SUFFIX")]
    pub(crate) markers: Vec<String>,
    /// Follow each submitted run until it reaches a terminal status.
    #[arg(long)]
    pub(crate) follow_runs: bool,
    #[command(flatten)]
    pub(crate) flow: FlowArgs,
}

/// Arguments for the `scanrelay monitor` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct MonitorCommand {
    /// Identifier of the run to follow.
    #[arg(long, value_name = "ID")]
    pub(crate) run_id: String,
    /// Stop following after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) max_duration: Option<u64>,
    #[command(flatten)]
    pub(crate) flow: FlowArgs,
}
