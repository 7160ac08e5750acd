//! Unit tests for the transfer orchestrator.

use super::*;
use crate::debounce::MarkerPatterns;
use crate::flows::RunStatus;
use crate::test_support::{ScriptedFlowsClient, ScriptedFlowsError};
use rstest::{fixture, rstest};
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;

const FAST: Duration = Duration::from_millis(2);
const SCAN_DIR: &str = "/xfel/ffs/dat/ue_251023_FXL/rawData/251023_alignment_00001_DIR";

#[fixture]
fn settings() -> TransferSettings {
    TransferSettings::new("source-collection", "dest-collection", "/backup")
}

fn orchestrator(
    client: &ScriptedFlowsClient,
    settings: TransferSettings,
) -> TransferOrchestrator<ScriptedFlowsClient> {
    TransferOrchestrator::new(Arc::new(client.clone()), settings, RunMonitor::new(FAST))
        .with_retry_delay(Duration::ZERO)
}

#[rstest]
#[tokio::test]
async fn transfer_scan_submits_reference_request(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_ok("run-1");

    let scan = orchestrator(&client, settings)
        .transfer_scan(Utf8Path::new(SCAN_DIR))
        .await
        .expect("scan should be submitted");

    assert_eq!(scan.handle.run_id, "run-1");
    assert_eq!(scan.identity.experiment.as_deref(), Some("ue_251023_FXL"));
    assert_eq!(
        scan.request.dest_path,
        "/backup/ue_251023_FXL/rawData/251023_alignment_00001_DIR/"
    );
    assert_eq!(client.submitted(), vec![scan.request]);
}

#[rstest]
#[tokio::test]
async fn missing_experiment_is_not_submitted(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();

    let err = orchestrator(&client, settings)
        .transfer_scan(Utf8Path::new("/data/rawData/scan01"))
        .await
        .expect_err("scan without experiment should fail");

    assert!(matches!(err, TransferError::Build(_)), "unexpected: {err}");
    assert!(client.submitted().is_empty());
}

#[rstest]
#[tokio::test]
async fn retries_resend_the_identical_request(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_err(ScriptedFlowsError::Network);
    client.push_submit_ok("run-2");

    let scan = orchestrator(&client, settings)
        .with_submit_attempts(3)
        .transfer_scan(Utf8Path::new(SCAN_DIR))
        .await
        .expect("second attempt should succeed");

    let submitted = client.submitted();
    assert_eq!(scan.handle.run_id, "run-2");
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted.first(), submitted.last());
}

#[rstest]
#[case(1, 1)]
#[case(0, 1)]
#[case(2, 2)]
#[tokio::test]
async fn submission_attempts_are_bounded(
    settings: TransferSettings,
    #[case] attempts: u32,
    #[case] expected_calls: usize,
) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_err(ScriptedFlowsError::Network);
    client.push_submit_err(ScriptedFlowsError::Rejected(String::from("quota")));

    let err = orchestrator(&client, settings)
        .with_submit_attempts(attempts)
        .transfer_scan(Utf8Path::new(SCAN_DIR))
        .await
        .expect_err("every attempt fails");

    assert!(matches!(err, TransferError::Submission(_)), "unexpected: {err}");
    assert_eq!(client.submitted().len(), expected_calls);
}

#[rstest]
#[tokio::test]
async fn failed_run_becomes_terminal_failure(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_status(RunState::new(RunStatus::Active));
    client.push_status(RunState::new(RunStatus::Failed).with_detail("permission denied"));

    let mut seen = Vec::new();
    let err = orchestrator(&client, settings)
        .follow("run-1", |state| seen.push(state.status))
        .await
        .expect_err("failed run should surface");

    assert_eq!(seen, vec![RunStatus::Active, RunStatus::Failed]);
    match err {
        TransferError::TerminalFailure { run_id, detail } => {
            assert_eq!(run_id, "run-1");
            assert_eq!(detail, "permission denied");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[tokio::test]
async fn inactive_run_is_reported_as_outcome(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_status(RunState::new(RunStatus::Inactive).with_detail("consent required"));

    let outcome = orchestrator(&client, settings)
        .follow("run-1", |_| {})
        .await
        .expect("inactive is not an error");

    assert_eq!(
        outcome.last_state().map(|state| state.status),
        Some(RunStatus::Inactive)
    );
}

#[rstest]
#[tokio::test]
async fn duplicate_markers_trigger_one_submission(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_ok("run-1");
    let (sender, receiver) = unbounded_channel();
    sender
        .send(RawFsEvent::file_created(format!("{SCAN_DIR}/part1.done")))
        .expect("receiver open");
    sender
        .send(RawFsEvent::file_created(format!("{SCAN_DIR}/part2.done")))
        .expect("receiver open");
    sender
        .send(RawFsEvent::file_created(format!("{SCAN_DIR}/frame.h5")))
        .expect("receiver open");
    drop(sender);

    let debouncer = CompletionDebouncer::new(MarkerPatterns::default());
    let summary = Arc::new(orchestrator(&client, settings))
        .watch(receiver, &debouncer, false)
        .await;

    assert_eq!(
        summary,
        WatchSummary {
            emitted: 1,
            submitted: 1,
            failed: 0,
            runs_failed: 0,
        }
    );
    assert_eq!(client.submitted().len(), 1);
}

#[rstest]
#[tokio::test]
async fn failed_scan_does_not_stop_the_loop(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_ok("run-ok");
    let (sender, receiver) = unbounded_channel();
    sender
        .send(RawFsEvent::file_created("/data/rawData/scan01/part1.done"))
        .expect("receiver open");
    sender
        .send(RawFsEvent::file_created(format!("{SCAN_DIR}/part1.done")))
        .expect("receiver open");
    drop(sender);

    let debouncer = CompletionDebouncer::new(MarkerPatterns::default());
    let summary = Arc::new(orchestrator(&client, settings))
        .watch(receiver, &debouncer, false)
        .await;

    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.failed, 1);
}

#[rstest]
#[tokio::test]
async fn followed_runs_are_counted_when_they_fail(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_ok("run-1");
    client.push_status(RunState::new(RunStatus::Failed));
    let (sender, receiver) = unbounded_channel();
    sender
        .send(RawFsEvent::file_created(format!("{SCAN_DIR}/part1.done")))
        .expect("receiver open");
    drop(sender);

    let debouncer = CompletionDebouncer::new(MarkerPatterns::default());
    let summary = Arc::new(orchestrator(&client, settings))
        .watch(receiver, &debouncer, true)
        .await;

    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.runs_failed, 1);
}

#[rstest]
#[tokio::test]
async fn cancellation_stops_the_watch_loop(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    let cancel = CancellationToken::new();
    let monitor = RunMonitor::new(FAST).with_cancellation(cancel.clone());
    let orchestrator = Arc::new(TransferOrchestrator::new(
        Arc::new(client.clone()),
        settings,
        monitor,
    ));
    let (_sender, receiver) = unbounded_channel();
    cancel.cancel();

    let debouncer = CompletionDebouncer::default();
    let summary = orchestrator.watch(receiver, &debouncer, false).await;

    assert_eq!(summary, WatchSummary::default());
    assert!(client.submitted().is_empty());
}

#[rstest]
#[tokio::test]
async fn submission_failure_does_not_stop_the_loop(settings: TransferSettings) {
    let client = ScriptedFlowsClient::new();
    client.push_submit_err(ScriptedFlowsError::Network);
    client.push_submit_ok("run-1");
    client.push_submit_ok("run-2");
    let (sender, receiver) = unbounded_channel();
    let orchestrator = Arc::new(orchestrator(&client, settings));
    let watch = tokio::spawn(async move {
        let debouncer = CompletionDebouncer::new(MarkerPatterns::default());
        orchestrator.watch(receiver, &debouncer, false).await
    });

    for scan in ["scan01", "scan02"] {
        sender
            .send(RawFsEvent::file_created(format!(
                "/xfel/ffs/dat/ue_251023_FXL/rawData/{scan}/part1.done"
            )))
            .expect("receiver open");
    }
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.submitted().len() < 2 {
            tokio::time::sleep(FAST).await;
        }
    })
    .await
    .expect("both scans should be submitted");
    sender
        .send(RawFsEvent::file_created(
            "/xfel/ffs/dat/ue_251023_FXL/rawData/scan03/part1.done",
        ))
        .expect("watch loop still consuming after a failed submission");
    drop(sender);

    let summary = watch.await.expect("watch task should not panic");

    assert_eq!(
        summary,
        WatchSummary {
            emitted: 3,
            submitted: 2,
            failed: 1,
            runs_failed: 0,
        }
    );
    assert_eq!(client.submitted().len(), 3);
}
