//! Unit tests for the `scanrelay` CLI binary implementation.
//!
//! Keeping these tests in a separate module helps keep `src/main.rs` focused
//! on dispatch.

use super::*;
use rstest::{fixture, rstest};
use scanrelay::test_support::EnvGuard;

const FLOW_ID: &str = "11111111-2222-3333-4444-555555555555";

#[fixture]
fn config() -> RelayConfig {
    RelayConfig {
        access_token: String::from("token"),
        flows_api_url: String::from("https://flows.example.test"),
        flow_id: String::from(FLOW_ID),
        source_collection: String::from("aaaaaaaa-0000-0000-0000-000000000001"),
        dest_collection: String::from("aaaaaaaa-0000-0000-0000-000000000002"),
        dest_base_path: String::from("/backup"),
        local_prefix: String::from("/xfel/ffs"),
        remote_mount_token: String::from("/~"),
        poll_interval_secs: 5,
        max_monitor_secs: None,
        submit_attempts: 1,
    }
}

fn unset_config_env() -> [(&'static str, Option<&'static str>); 5] {
    [
        ("SCANRELAY_ACCESS_TOKEN", None),
        ("SCANRELAY_FLOW_ID", None),
        ("SCANRELAY_SOURCE_COLLECTION", None),
        ("SCANRELAY_DEST_COLLECTION", None),
        ("SCANRELAY_CONFIG_PATH", None),
    ]
}

#[rstest]
fn overrides_replace_only_supplied_values(mut config: RelayConfig) {
    let flow = FlowArgs {
        dest_base_path: Some(String::from("/archive")),
        poll_interval: Some(30),
        ..FlowArgs::default()
    };

    apply_overrides(&mut config, &flow);

    assert_eq!(config.dest_base_path, "/archive");
    assert_eq!(config.poll_interval_secs, 30);
    assert_eq!(config.flow_id, FLOW_ID);
}

#[rstest]
fn orchestrator_applies_label_override(mut config: RelayConfig) {
    config.submit_attempts = 3;
    let orchestrator = build_orchestrator(
        &config,
        CancellationToken::new(),
        Some(String::from("manual label")),
    )
    .expect("valid configuration");

    assert_eq!(
        orchestrator.settings().label_override.as_deref(),
        Some("manual label")
    );
}

#[rstest]
fn orchestrator_rejects_invalid_collection(mut config: RelayConfig) {
    config.dest_collection = String::from("not-a-uuid");
    let err = build_orchestrator(&config, CancellationToken::new(), None)
        .expect_err("invalid collection");

    assert!(
        matches!(err, CliError::Config(ConfigError::InvalidField(ref message)) if message.contains("SCANRELAY_DEST_COLLECTION")),
        "unexpected error: {err}"
    );
}

#[rstest]
#[case::succeeded(MonitorOutcome::Finished(RunState::new(RunStatus::Succeeded)), EXIT_SUCCESS)]
#[case::failed(MonitorOutcome::Finished(RunState::new(RunStatus::Failed)), EXIT_FAILURE)]
#[case::inactive(MonitorOutcome::Finished(RunState::new(RunStatus::Inactive)), EXIT_INCOMPLETE)]
#[case::cancelled(MonitorOutcome::Cancelled { last: None }, EXIT_SUCCESS)]
#[case::timed_out(
    MonitorOutcome::TimedOut { last: Some(RunState::new(RunStatus::Active)) },
    EXIT_INCOMPLETE
)]
fn outcomes_map_to_exit_codes(#[case] outcome: MonitorOutcome, #[case] expected: i32) {
    assert_eq!(outcome_exit_code(&outcome), expected);
}

#[test]
fn submission_report_lists_run_and_monitor_url() {
    let mut buf = Vec::new();
    report_submission(&mut buf, &RunHandle::new("run-123")).expect("write to buffer");
    let rendered = String::from_utf8(buf).expect("utf8");

    assert_eq!(
        rendered,
        "run_id: run-123\nmonitor: https://app.globus.org/runs/run-123\n"
    );
}

#[test]
fn write_error_writes_cli_error() {
    let mut buf = Vec::new();
    let err = CliError::Transfer(TransferError::TerminalFailure {
        run_id: String::from("run-9"),
        detail: String::from("endpoint offline"),
    });
    write_error(&mut buf, &err);
    let rendered = String::from_utf8(buf).expect("utf8");

    assert!(
        rendered.contains("transfer run run-9 failed: endpoint offline"),
        "rendered: {rendered}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn submit_without_credentials_fails_before_network() {
    let _guard = EnvGuard::set_vars(&unset_config_env()).await;
    let cli = Cli::try_parse_from([
        "scanrelay",
        "submit",
        "--scan-dir",
        "/xfel/ffs/dat/ue_251023_FXL/rawData/scan01",
    ])
    .expect("arguments parse");

    let err = dispatch(cli, CancellationToken::new())
        .await
        .expect_err("missing configuration");

    assert!(matches!(err, CliError::Config(_)), "unexpected error: {err}");
}

#[tokio::test(flavor = "current_thread")]
async fn monitor_without_token_fails_before_network() {
    let _guard = EnvGuard::set_vars(&unset_config_env()).await;
    let cli = Cli::try_parse_from(["scanrelay", "monitor", "--run-id", "run-1"])
        .expect("arguments parse");

    let err = dispatch(cli, CancellationToken::new())
        .await
        .expect_err("missing configuration");

    assert!(matches!(err, CliError::Config(_)), "unexpected error: {err}");
}

#[test]
fn watch_accepts_repeated_markers() {
    let cli = Cli::try_parse_from([
        "scanrelay",
        "watch",
        "--watch-dir",
        "/xfel/ffs/dat",
        "--marker",
        ".done",
        "--marker",
        ".finished",
        "--follow-runs",
    ])
    .expect("arguments parse");

    let Cli::Watch(command) = cli else {
        panic!("expected watch subcommand");
    };
    assert_eq!(command.markers, vec![".done", ".finished"]);
    assert!(command.follow_runs);
}

#[test]
fn run_requires_both_paths() {
    let result = Cli::try_parse_from(["scanrelay", "run", "--source-path", "/~/a/"]);

    assert!(result.is_err());
}

#[test]
fn every_subcommand_has_a_man_page_summary() {
    let command = <Cli as clap::CommandFactory>::command();
    command.clone().debug_assert();

    let names: Vec<&str> = command
        .get_subcommands()
        .map(|subcommand| {
            assert!(
                subcommand.get_about().is_some(),
                "{} has no summary",
                subcommand.get_name()
            );
            subcommand.get_name()
        })
        .collect();
    assert_eq!(names, vec!["submit", "run", "watch", "monitor"]);
}
