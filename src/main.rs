//! Binary entry point for the scanrelay CLI.

mod cli;

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scanrelay::{
    BuildError, CompletionDebouncer, ConfigError, FsEventSource, GlobusError, GlobusFlowsClient,
    MarkerPatterns, MonitorOutcome, RelayConfig, RunHandle, RunState, RunStatus, TransferError,
    TransferOrchestrator, WatchError,
};

use cli::{Cli, FlowArgs, MonitorCommand, RunCommand, SubmitCommand, WatchCommand};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_INCOMPLETE: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Flows client error: {0}")]
    Client(#[from] GlobusError),
    #[error("invalid transfer request: {0}")]
    Request(#[from] BuildError),
    #[error(transparent)]
    Transfer(#[from] TransferError<GlobusError>),
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let exit_code = match dispatch(cli, cancel).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            EXIT_FAILURE
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanrelay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; shutting down");
                cancel.cancel();
            }
            Err(err) => warn!(error = %err, "cannot listen for interrupts"),
        }
    });
}

async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<i32, CliError> {
    match cli {
        Cli::Submit(command) => exec_submit(command, cancel).await,
        Cli::Run(command) => exec_run(command, cancel).await,
        Cli::Watch(command) => exec_watch(command, cancel).await,
        Cli::Monitor(command) => exec_monitor(command, cancel).await,
    }
}

async fn exec_submit(args: SubmitCommand, cancel: CancellationToken) -> Result<i32, CliError> {
    let config = load_config(&args.flow)?;
    let orchestrator = build_orchestrator(&config, cancel, args.label)?;
    let scan = orchestrator
        .transfer_scan(Utf8Path::new(&args.scan_dir))
        .await?;
    report_submission(io::stdout(), &scan.handle)?;

    if args.monitor {
        follow_run(&orchestrator, &scan.handle.run_id).await
    } else {
        Ok(EXIT_SUCCESS)
    }
}

async fn exec_run(args: RunCommand, cancel: CancellationToken) -> Result<i32, CliError> {
    let config = load_config(&args.flow)?;
    let orchestrator = build_orchestrator(&config, cancel, args.label)?;
    let request = orchestrator
        .settings()
        .manual_request(&args.source_path, &args.dest_path)?;
    let handle = orchestrator.transfer_request(&request).await?;
    report_submission(io::stdout(), &handle)?;

    if args.monitor {
        follow_run(&orchestrator, &handle.run_id).await
    } else {
        Ok(EXIT_SUCCESS)
    }
}

async fn exec_watch(args: WatchCommand, cancel: CancellationToken) -> Result<i32, CliError> {
    let config = load_config(&args.flow)?;
    let orchestrator = Arc::new(build_orchestrator(&config, cancel, None)?);
    let patterns = if args.markers.is_empty() {
        MarkerPatterns::default()
    } else {
        MarkerPatterns::new(args.markers)
    };
    let debouncer = CompletionDebouncer::new(patterns);

    let (sender, receiver) = unbounded_channel();
    let source = FsEventSource::spawn(Utf8Path::new(&args.watch_dir), sender)?;
    let summary = orchestrator
        .watch(receiver, &debouncer, args.follow_runs)
        .await;

    writeln!(
        io::stdout(),
        "watch of {} finished: {} scans detected, {} submitted, {} failed",
        source.root(),
        summary.emitted,
        summary.submitted,
        summary.failed
    )?;
    drop(source);
    Ok(EXIT_SUCCESS)
}

async fn exec_monitor(args: MonitorCommand, cancel: CancellationToken) -> Result<i32, CliError> {
    let mut config = load_config(&args.flow)?;
    if args.max_duration.is_some() {
        config.max_monitor_secs = args.max_duration;
    }
    config.validate_client()?;
    let client = GlobusFlowsClient::from_config(&config)?;
    let monitor = config.run_monitor().with_cancellation(cancel);

    let outcome = monitor
        .monitor(&client, &args.run_id, print_transition)
        .await;
    if let MonitorOutcome::Finished(RunState {
        status: RunStatus::Failed,
        detail,
    }) = outcome
    {
        return Err(CliError::Transfer(TransferError::TerminalFailure {
            run_id: args.run_id,
            detail: detail.unwrap_or_else(|| String::from("no detail provided")),
        }));
    }
    Ok(outcome_exit_code(&outcome))
}

fn load_config(flow: &FlowArgs) -> Result<RelayConfig, CliError> {
    let mut config = RelayConfig::load_without_cli_args()?;
    apply_overrides(&mut config, flow);
    Ok(config)
}

fn apply_overrides(config: &mut RelayConfig, flow: &FlowArgs) {
    if let Some(value) = &flow.flow_id {
        config.flow_id.clone_from(value);
    }
    if let Some(value) = &flow.source_collection {
        config.source_collection.clone_from(value);
    }
    if let Some(value) = &flow.dest_collection {
        config.dest_collection.clone_from(value);
    }
    if let Some(value) = &flow.dest_base_path {
        config.dest_base_path.clone_from(value);
    }
    if let Some(secs) = flow.poll_interval {
        config.poll_interval_secs = secs;
    }
}

fn build_orchestrator(
    config: &RelayConfig,
    cancel: CancellationToken,
    label: Option<String>,
) -> Result<TransferOrchestrator<GlobusFlowsClient>, CliError> {
    let settings = config.transfer_settings()?.with_label(label);
    let client = GlobusFlowsClient::from_config(config)?;
    let monitor = config.run_monitor().with_cancellation(cancel);
    Ok(
        TransferOrchestrator::new(Arc::new(client), settings, monitor)
            .with_submit_attempts(config.submit_attempts),
    )
}

async fn follow_run(
    orchestrator: &TransferOrchestrator<GlobusFlowsClient>,
    run_id: &str,
) -> Result<i32, CliError> {
    let outcome = orchestrator.follow(run_id, print_transition).await?;
    Ok(outcome_exit_code(&outcome))
}

fn outcome_exit_code(outcome: &MonitorOutcome) -> i32 {
    match outcome {
        MonitorOutcome::Finished(state) => match state.status {
            RunStatus::Failed => EXIT_FAILURE,
            RunStatus::Inactive => EXIT_INCOMPLETE,
            RunStatus::Succeeded | RunStatus::Active => EXIT_SUCCESS,
        },
        MonitorOutcome::Cancelled { .. } => {
            info!("stopped following run on request");
            EXIT_SUCCESS
        }
        MonitorOutcome::TimedOut { last } => {
            warn!(
                last_status = last.as_ref().map_or("unknown", |state| state.status.as_str()),
                "stopped following run after the monitoring deadline"
            );
            EXIT_INCOMPLETE
        }
    }
}

fn print_transition(state: &RunState) {
    writeln!(io::stdout(), "status: {state}").ok();
}

fn report_submission(mut target: impl Write, handle: &RunHandle) -> io::Result<()> {
    writeln!(target, "run_id: {}", handle.run_id)?;
    writeln!(target, "monitor: {}", handle.monitor_url())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
