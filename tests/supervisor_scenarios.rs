use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use guardian_keeper::chain::MockChainRpc;
use guardian_keeper::notify::{Notification, RecordingNotifier};
use guardian_keeper::runtime::MockRuntime;
use guardian_keeper::supervisor::{FundingOutcome, IdentityRecord};
use guardian_keeper::{NodeConfig, NodeSupervisor, RunState, SupervisorError, WorkerConfig};

const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const BURNER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const BURNER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

fn burner_line() -> String {
    format!(
        "2025-01-01T00:00:05Z INFO Using burner wallet {{\"address\": \"{}\"}}",
        BURNER
    )
}

fn line(s: &str) -> String {
    s.to_string()
}

fn config_with_key() -> NodeConfig {
    serde_yaml::from_str(&format!(
        r#"
owner_private_key: "{}"
docker_image: "mawari/guardian:latest"
rpc_url: "http://127.0.0.1:8545"
chain_id: 576
min_burner_balance: "0.5"
fund_burner_amount: "1"
"#,
        OWNER_KEY
    ))
    .unwrap()
}

fn config_without_key() -> NodeConfig {
    serde_yaml::from_str(&format!(
        r#"
owner_address: "{}"
docker_image: "mawari/guardian:latest"
rpc_url: "http://127.0.0.1:8545"
chain_id: 576
"#,
        OWNER
    ))
    .unwrap()
}

struct Harness {
    _base: tempfile::TempDir,
    worker: WorkerConfig,
    runtime: Arc<MockRuntime>,
    rpc: Arc<MockChainRpc>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(runtime: MockRuntime, rpc: MockChainRpc, notifier: RecordingNotifier) -> Self {
        let base = tempfile::tempdir().unwrap();
        let worker = WorkerConfig::new(base.path(), "worker1");
        Self {
            _base: base,
            worker,
            runtime: Arc::new(runtime),
            rpc: Arc::new(rpc),
            notifier: Arc::new(notifier),
        }
    }

    fn supervisor(&self, config: NodeConfig) -> NodeSupervisor {
        NodeSupervisor::new(
            config,
            self.worker.clone(),
            self.runtime.clone(),
            self.rpc.clone(),
            self.notifier.clone(),
        )
        .unwrap()
    }
}

fn dec(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}

// Scenario A: identity at 5s, already funded, heartbeat at 10s
#[tokio::test(start_paused = true)]
async fn scenario_funded_node_reports_liveness() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(1), line("Starting guardian node")),
        (Duration::from_secs(4), burner_line()),
        (Duration::from_secs(5), line("INFO Successfully submitted heartbeat")),
    ]);
    let h = Harness::new(
        runtime,
        MockChainRpc::new().with_balances([dec(2, 0)]),
        RecordingNotifier::new(),
    );
    std::fs::create_dir_all(&h.worker.cache_dir).unwrap();
    std::fs::write(
        &h.worker.node_cache_file,
        format!(r#"{{"wallet": {{"privateKey": "{}"}}}}"#, BURNER_KEY),
    )
    .unwrap();

    let started = tokio::time::Instant::now();
    let mut supervisor = h.supervisor(config_with_key());
    let report = supervisor.run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(report.identity.burner.to_string(), BURNER);
    assert_eq!(
        report.identity.burner_key.as_ref().map(|k| k.expose()),
        Some(BURNER_KEY)
    );
    assert_eq!(report.funding, FundingOutcome::NotNeeded);
    assert!(report.liveness.achieved);
    assert_eq!(
        report.liveness.matched_line.as_deref(),
        Some("INFO Successfully submitted heartbeat")
    );
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.states,
        vec![
            RunState::Starting,
            RunState::CapturingIdentity,
            RunState::NotifyingIdentity,
            RunState::CheckingBalance,
            RunState::WatchingHeartbeat,
            RunState::Done,
        ]
    );

    // One probe, no transfer
    assert_eq!(h.rpc.balance_queries(), 1);
    assert!(h.rpc.submitted().is_empty());

    let record = IdentityRecord::load(&h.worker.record_path).unwrap().unwrap();
    assert_eq!(record.burner, BURNER);

    let events = h.notifier.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        Notification::Identity {
            owner: OWNER.parse().unwrap(),
            burner: BURNER.parse().unwrap(),
            key_recovered: true,
        }
    );
    match &events[1] {
        Notification::Status { success, details } => {
            assert!(success);
            assert!(details.starts_with("```"));
            assert!(details.ends_with("INFO Successfully submitted heartbeat```"));
        }
        other => panic!("expected status, got {:?}", other),
    }
}

// Scenario B: no burner announcement within the identity window
#[tokio::test(start_paused = true)]
async fn scenario_identity_timeout_skips_funding_and_heartbeat() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(1), line("Starting guardian node")),
        (Duration::from_secs(30), line("Waiting for network")),
    ]);
    let h = Harness::new(runtime, MockChainRpc::new(), RecordingNotifier::new());

    let started = tokio::time::Instant::now();
    let mut supervisor = h.supervisor(config_with_key());
    let err = supervisor.run().await.unwrap_err();

    assert!(matches!(err, SupervisorError::IdentityTimeout(t) if t == Duration::from_secs(60)));
    assert_eq!(err.exit_code(), 3);
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert!(started.elapsed() < Duration::from_secs(61));
    assert_eq!(supervisor.state(), Some(RunState::IdentityFailed));

    assert_eq!(h.rpc.balance_queries(), 0);
    assert!(h.rpc.submitted().is_empty());
    assert_eq!(h.runtime.streams_opened(), 1);
    assert_eq!(
        h.notifier.events(),
        vec![Notification::Status {
            success: false,
            details: "```Failed to capture burner```".to_string(),
        }]
    );
    assert_eq!(IdentityRecord::load(&h.worker.record_path).unwrap(), None);
}

// Scenario C: transfer goes out but the balance never rises
#[tokio::test(start_paused = true)]
async fn scenario_unconfirmed_funding_still_watches_heartbeat() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(5), burner_line()),
        (Duration::from_secs(5), line("Sending heartbeat")),
    ]);
    let h = Harness::new(
        runtime,
        MockChainRpc::new()
            .with_balances([dec(1, 1)])
            .with_nonce(7),
        RecordingNotifier::new(),
    );

    let mut supervisor = h.supervisor(config_with_key());
    let report = supervisor.run().await.unwrap();

    // 1 probe + 10 re-checks
    assert_eq!(h.rpc.balance_queries(), 11);
    assert_eq!(h.rpc.submitted().len(), 1);

    match &report.funding {
        FundingOutcome::Submitted {
            transfer,
            balance_reached,
        } => {
            assert!(!balance_reached);
            assert_eq!(transfer.nonce, 7);
            assert_eq!(transfer.from.to_string(), OWNER);
            assert_eq!(transfer.to.to_string(), BURNER);
            assert_eq!(
                transfer.value,
                alloy::primitives::U256::from(1_000_000_000_000_000_000u128)
            );
        }
        other => panic!("expected submitted transfer, got {:?}", other),
    }

    assert!(report.liveness.achieved);
    assert_eq!(
        report.states,
        vec![
            RunState::Starting,
            RunState::CapturingIdentity,
            RunState::NotifyingIdentity,
            RunState::CheckingBalance,
            RunState::Funding,
            RunState::ReCheckingBalance,
            RunState::WatchingHeartbeat,
            RunState::Done,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_transfer_does_not_stop_run() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(2), burner_line()),
        (Duration::from_secs(2), line("delegation offer accepted")),
    ]);
    let rpc = MockChainRpc::new().with_balances([dec(0, 0), dec(0, 0), dec(1, 0)]);
    rpc.fail_submissions();
    let h = Harness::new(runtime, rpc, RecordingNotifier::new());

    let report = h.supervisor(config_with_key()).run().await.unwrap();

    match &report.funding {
        FundingOutcome::Failed {
            balance_reached, ..
        } => assert!(balance_reached),
        other => panic!("expected failed transfer, got {:?}", other),
    }
    // Probe, then the re-check succeeds on its second reading
    assert_eq!(h.rpc.balance_queries(), 3);
    assert!(report.liveness.achieved);
}

#[tokio::test(start_paused = true)]
async fn test_no_owner_key_skips_transfer() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(2), burner_line()),
        (Duration::from_secs(2), line("sending heartbeat")),
    ]);
    let h = Harness::new(
        runtime,
        MockChainRpc::new().with_balances([dec(0, 0)]),
        RecordingNotifier::new(),
    );

    let report = h.supervisor(config_without_key()).run().await.unwrap();

    assert_eq!(
        report.funding,
        FundingOutcome::NoOwnerKey {
            balance_reached: false
        }
    );
    assert!(h.rpc.submitted().is_empty());
    assert_eq!(h.rpc.balance_queries(), 11);
}

#[tokio::test(start_paused = true)]
async fn test_restart_leaves_exactly_one_instance() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(1), burner_line()),
        (Duration::from_secs(1), line("sending heartbeat")),
    ]);
    let h = Harness::new(
        runtime,
        MockChainRpc::new().with_balances([dec(5, 0)]),
        RecordingNotifier::new(),
    );

    let mut supervisor = h.supervisor(config_with_key());
    let first = supervisor.run().await.unwrap();
    let second = supervisor.run().await.unwrap();

    assert_ne!(first.container_id, second.container_id);
    assert_eq!(h.runtime.instances(), vec!["mawari_worker1".to_string()]);
    assert_eq!(second.states.first(), Some(&RunState::Starting));

    let spec = h.runtime.launched_spec("mawari_worker1").unwrap();
    assert_eq!(spec.env, vec![("OWNERS_ALLOWLIST".to_string(), OWNER.to_string())]);
    assert_eq!(spec.volumes[0].host, h.worker.cache_dir);
}

#[tokio::test(start_paused = true)]
async fn test_notification_failures_are_not_fatal() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(1), burner_line()),
        (Duration::from_secs(1), line("sending heartbeat")),
    ]);
    let h = Harness::new(
        runtime,
        MockChainRpc::new().with_balances([dec(1, 0)]),
        RecordingNotifier::failing(),
    );

    let report = h.supervisor(config_with_key()).run().await.unwrap();

    assert!(report.liveness.achieved);
    assert_eq!(h.notifier.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_balance_query_failure_ends_run() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(1), burner_line()),
        (Duration::from_secs(1), line("sending heartbeat")),
    ]);
    let rpc = MockChainRpc::new();
    rpc.fail_balance_queries();
    let h = Harness::new(runtime, rpc, RecordingNotifier::new());

    let mut supervisor = h.supervisor(config_with_key());
    let err = supervisor.run().await.unwrap_err();

    assert!(matches!(err, SupervisorError::BalanceQuery(_)));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(supervisor.state(), Some(RunState::Aborted));
    assert!(h.rpc.submitted().is_empty());
    // Heartbeat watch never opened a second stream
    assert_eq!(h.runtime.streams_opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_launch_failure_is_reported() {
    let h = Harness::new(
        MockRuntime::new().failing_start(),
        MockChainRpc::new(),
        RecordingNotifier::new(),
    );

    let mut supervisor = h.supervisor(config_with_key());
    let err = supervisor.run().await.unwrap_err();

    assert!(matches!(err, SupervisorError::Launch(_)));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(supervisor.history(), &[RunState::Starting, RunState::LaunchFailed]);
    assert_eq!(h.runtime.streams_opened(), 0);

    let events = h.notifier.events();
    assert!(matches!(
        events.as_slice(),
        [Notification::Status { success: false, .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_missing_heartbeat_reports_failure_with_evidence() {
    let runtime = MockRuntime::new().with_log_script(vec![
        (Duration::from_secs(1), burner_line()),
        (Duration::from_secs(1), line("Connecting to peers")),
    ]);
    let h = Harness::new(
        runtime,
        MockChainRpc::new().with_balances([dec(1, 0)]),
        RecordingNotifier::new(),
    );

    let report = h.supervisor(config_with_key()).run().await.unwrap();

    assert!(!report.liveness.achieved);
    assert_eq!(report.exit_code(), 5);
    assert_eq!(
        report.liveness.evidence,
        vec![burner_line(), line("Connecting to peers")]
    );
    assert_eq!(report.states.last(), Some(&RunState::Done));

    let events = h.notifier.events();
    assert_eq!(
        events.last(),
        Some(&Notification::Status {
            success: false,
            details: format!("```{}\nConnecting to peers```", burner_line()),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run() {
    let runtime = MockRuntime::new().with_log_script(vec![(
        Duration::from_secs(30),
        burner_line(),
    )]);
    let h = Harness::new(runtime, MockChainRpc::new(), RecordingNotifier::new());
    let cancel = CancellationToken::new();

    let mut supervisor = h.supervisor(config_with_key()).with_cancellation(cancel.clone());
    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();
    });

    let err = supervisor.run().await.unwrap_err();
    trigger.await.unwrap();

    assert!(matches!(err, SupervisorError::Cancelled));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(supervisor.state(), Some(RunState::Aborted));
    assert!(h.notifier.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_output_fails_identity_capture() {
    let h = Harness::new(
        MockRuntime::new().failing_streams(),
        MockChainRpc::new(),
        RecordingNotifier::new(),
    );

    let mut supervisor = h.supervisor(config_with_key());
    let err = supervisor.run().await.unwrap_err();

    assert!(matches!(err, SupervisorError::OutputStream(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(supervisor.state(), Some(RunState::IdentityFailed));
    assert_eq!(h.rpc.balance_queries(), 0);
    assert_eq!(
        h.notifier.events(),
        vec![Notification::Status {
            success: false,
            details: "```Failed to capture burner```".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_output_during_heartbeat_reports_no_liveness() {
    let runtime = MockRuntime::new()
        .with_log_script(vec![(Duration::from_secs(1), burner_line())])
        .failing_streams_after(1);
    let h = Harness::new(
        runtime,
        MockChainRpc::new().with_balances([dec(1, 0)]),
        RecordingNotifier::new(),
    );

    let report = h.supervisor(config_with_key()).run().await.unwrap();

    assert!(!report.liveness.achieved);
    assert_eq!(report.liveness.matched_line, None);
    assert_eq!(report.liveness.evidence.len(), 1);
    assert!(report.liveness.evidence[0].contains("logs -f mawari_worker1"));
    assert_eq!(report.exit_code(), 5);
    assert_eq!(report.states.last(), Some(&RunState::Done));

    match h.notifier.events().last() {
        Some(Notification::Status { success, details }) => {
            assert!(!success);
            assert!(details.contains("error from daemon"));
        }
        other => panic!("expected status, got {:?}", other),
    }
}
