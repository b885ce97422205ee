//! Node Supervisor
//!
//! Drives one supervision run of a guardian worker as a sequential state
//! machine (see [`RunState`]). Fatal failures end the run with a
//! [`SupervisorError`]; best-effort steps (notifications, funding, the
//! post-funding re-check) are logged and folded into the [`RunReport`].

use alloy::primitives::Address;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::SupervisorError;
use super::identity::{IdentityRecord, WorkerIdentity, read_burner_key};
use super::state::RunState;
use super::worker::WorkerConfig;
use crate::chain::ChainRpc;
use crate::config::{ConfigError, NodeConfig};
use crate::funding::{BalanceMonitor, FundingTransfer, SubmittedTransfer};
use crate::notify::NotificationSink;
use crate::notify::format::code_block;
use crate::runtime::{ContainerRuntime, LaunchSpec, RuntimeError, VolumeMount};
use crate::watcher::{LogWatcher, PatternSet, WatchError};

const IDENTITY_FAILURE_DETAILS: &str = "```Failed to capture burner```";

/// What happened between the first balance probe and the heartbeat watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingOutcome {
    /// Burner already held the minimum
    NotNeeded,
    /// No owner key configured, nothing was sent
    NoOwnerKey { balance_reached: bool },
    Submitted {
        transfer: SubmittedTransfer,
        balance_reached: bool,
    },
    Failed {
        error: String,
        balance_reached: bool,
    },
}

impl FundingOutcome {
    /// Whether the burner was seen at or above the minimum
    pub fn balance_reached(&self) -> bool {
        match self {
            FundingOutcome::NotNeeded => true,
            FundingOutcome::NoOwnerKey { balance_reached }
            | FundingOutcome::Submitted {
                balance_reached, ..
            }
            | FundingOutcome::Failed {
                balance_reached, ..
            } => *balance_reached,
        }
    }
}

/// Result of the heartbeat watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessResult {
    pub achieved: bool,
    pub matched_line: Option<String>,
    /// Last lines seen, whatever the outcome
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub container_id: String,
    pub identity: WorkerIdentity,
    pub funding: FundingOutcome,
    pub liveness: LivenessResult,
    pub states: Vec<RunState>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        if self.liveness.achieved { 0 } else { 5 }
    }
}

pub struct NodeSupervisor {
    config: NodeConfig,
    worker: WorkerConfig,
    owner: Address,
    runtime: Arc<dyn ContainerRuntime>,
    rpc: Arc<dyn ChainRpc>,
    notifier: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
    history: Vec<RunState>,
}

impl NodeSupervisor {
    pub fn new(
        config: NodeConfig,
        worker: WorkerConfig,
        runtime: Arc<dyn ContainerRuntime>,
        rpc: Arc<dyn ChainRpc>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        let owner = config.owner_address()?;
        Ok(Self {
            config,
            worker,
            owner,
            runtime,
            rpc,
            notifier,
            cancel: CancellationToken::new(),
            history: Vec::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// States entered by the most recent run, in order
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn state(&self) -> Option<RunState> {
        self.history.last().copied()
    }

    fn enter(&mut self, next: RunState) {
        if let Some(current) = self.state() {
            debug_assert!(
                current.can_transition_to(next),
                "illegal transition {} -> {}",
                current,
                next
            );
        }
        info!(worker = %self.worker.name, state = %next, "[SUP] state");
        self.history.push(next);
    }

    fn watcher(&self) -> LogWatcher {
        LogWatcher::new(
            self.config.supervision.poll_interval(),
            self.config.supervision.evidence_lines,
        )
        .with_cancellation(self.cancel.clone())
    }

    fn monitor(&self) -> BalanceMonitor {
        BalanceMonitor::new(self.rpc.clone()).with_cancellation(self.cancel.clone())
    }

    pub fn launch_spec(&self) -> LaunchSpec {
        let container = &self.config.container;
        LaunchSpec {
            image: self.config.docker_image.clone(),
            name: self.worker.container_name.clone(),
            volumes: vec![VolumeMount {
                host: self.worker.cache_dir.clone(),
                container: container.cache_mount.clone(),
            }],
            env: vec![(container.owner_env_var.clone(), self.owner.to_string())],
            restart: container.restart_policy,
            pull_always: container.pull_always,
        }
    }

    async fn report_status(&self, success: bool, details: &str) {
        if let Err(e) = self.notifier.notify_status(success, details).await {
            warn!(error = %e, "Status notification not delivered");
        }
    }

    /// Execute one full run
    pub async fn run(&mut self) -> Result<RunReport, SupervisorError> {
        self.history.clear();
        let result = self.run_inner().await;
        if let Err(e) = &result {
            if !self.state().is_some_and(|s| s.is_terminal()) {
                self.enter(RunState::Aborted);
            }
            error!(worker = %self.worker.name, error = %e, "Supervision run failed");
        }
        result
    }

    async fn run_inner(&mut self) -> Result<RunReport, SupervisorError> {
        self.enter(RunState::Starting);
        self.worker.ensure_dirs()?;
        let container_id = match self.start_node().await {
            Ok(id) => id,
            Err(e) => {
                self.enter(RunState::LaunchFailed);
                self.report_status(false, &code_block(&[e.to_string()]))
                    .await;
                return Err(SupervisorError::Launch(e));
            }
        };

        self.enter(RunState::CapturingIdentity);
        let identity = self.capture_identity().await?;

        self.enter(RunState::NotifyingIdentity);
        if let Err(e) = self
            .notifier
            .notify_identity(identity.owner, identity.burner, identity.burner_key.as_ref())
            .await
        {
            warn!(error = %e, "Identity notification not delivered");
        }

        self.enter(RunState::CheckingBalance);
        let funding = self.ensure_funded(identity.burner).await?;

        self.enter(RunState::WatchingHeartbeat);
        let liveness = self.watch_heartbeat().await?;

        self.enter(RunState::Done);
        self.report_status(liveness.achieved, &code_block(&liveness.evidence))
            .await;

        info!(
            worker = %self.worker.name,
            burner = %identity.burner,
            liveness = liveness.achieved,
            "Supervision run complete"
        );

        Ok(RunReport {
            container_id,
            identity,
            funding,
            liveness,
            states: self.history.clone(),
        })
    }

    /// Replace any previous instance with a fresh one
    async fn start_node(&self) -> Result<String, RuntimeError> {
        let spec = self.launch_spec();
        self.runtime.remove_if_exists(&spec.name).await?;
        let id = self.runtime.start(&spec).await?;
        info!(
            container = %spec.name,
            id = %id,
            image = %spec.image,
            restart = %spec.restart,
            "Node container started"
        );
        Ok(id)
    }

    async fn capture_identity(&mut self) -> Result<WorkerIdentity, SupervisorError> {
        let supervision = &self.config.supervision;
        let timeout = supervision.identity_timeout();
        let stream = match self
            .runtime
            .stream_output(&self.worker.container_name, supervision.log_tail_lines)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.enter(RunState::IdentityFailed);
                self.report_status(false, IDENTITY_FAILURE_DETAILS).await;
                return Err(SupervisorError::OutputStream(e));
            }
        };
        let patterns = PatternSet::burner_announcement()?;

        let burner = match self.watcher().watch(stream, &patterns, timeout).await {
            Ok(hit) => hit.capture(1).and_then(|raw| raw.parse::<Address>().ok()),
            Err(WatchError::Cancelled { .. }) => return Err(SupervisorError::Cancelled),
            Err(WatchError::TimedOut { .. }) => None,
        };

        let Some(burner) = burner else {
            self.enter(RunState::IdentityFailed);
            self.report_status(false, IDENTITY_FAILURE_DETAILS).await;
            return Err(SupervisorError::IdentityTimeout(timeout));
        };
        info!(burner = %burner, "Burner address captured");

        if let Err(e) = IdentityRecord::new(burner).save(&self.worker.record_path) {
            warn!(error = %e, "Burner record not persisted");
        }

        let burner_key = read_burner_key(&self.worker.node_cache_file);
        if burner_key.is_none() {
            warn!(path = %self.worker.node_cache_file.display(), "Burner key not found in node cache");
        }

        Ok(WorkerIdentity {
            owner: self.owner,
            burner,
            burner_key,
            captured_at: Utc::now(),
        })
    }

    /// Probe the burner balance and top it up when short.
    ///
    /// Only a failed balance query is fatal.
    async fn ensure_funded(&mut self, burner: Address) -> Result<FundingOutcome, SupervisorError> {
        let supervision = self.config.supervision.clone();
        let minimum = self.config.min_burner_balance;
        let monitor = self.monitor();

        let sufficient = monitor
            .poll_until(
                burner,
                minimum,
                supervision.initial_check_attempts,
                supervision.recheck_interval(),
            )
            .await?;
        if self.cancel.is_cancelled() {
            return Err(SupervisorError::Cancelled);
        }
        if sufficient {
            info!(burner = %burner, minimum = %minimum, "Burner already funded");
            return Ok(FundingOutcome::NotNeeded);
        }

        self.enter(RunState::Funding);
        let submission = match &self.config.owner_private_key {
            Some(key) => {
                let transfer =
                    FundingTransfer::new(self.rpc.clone()).with_gas_limit(supervision.gas_limit);
                Some(
                    transfer
                        .send(
                            key,
                            burner,
                            self.config.fund_burner_amount,
                            self.config.chain_id,
                        )
                        .await,
                )
            }
            None => {
                warn!(burner = %burner, "No owner_private_key configured; fund the burner manually");
                None
            }
        };
        if let Some(Err(e)) = &submission {
            error!(burner = %burner, error = %e, "Funding transfer failed");
        }

        self.enter(RunState::ReCheckingBalance);
        let balance_reached = monitor
            .poll_until(
                burner,
                minimum,
                supervision.recheck_attempts,
                supervision.recheck_interval(),
            )
            .await?;
        if self.cancel.is_cancelled() {
            return Err(SupervisorError::Cancelled);
        }
        if !balance_reached {
            warn!(burner = %burner, minimum = %minimum, "Burner balance still below minimum");
        }

        Ok(match submission {
            None => FundingOutcome::NoOwnerKey { balance_reached },
            Some(Ok(transfer)) => FundingOutcome::Submitted {
                transfer,
                balance_reached,
            },
            Some(Err(e)) => FundingOutcome::Failed {
                error: e.to_string(),
                balance_reached,
            },
        })
    }

    async fn watch_heartbeat(&self) -> Result<LivenessResult, SupervisorError> {
        let supervision = &self.config.supervision;
        let stream = match self
            .runtime
            .stream_output(&self.worker.container_name, supervision.log_tail_lines)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Cannot follow node output for heartbeat");
                return Ok(LivenessResult {
                    achieved: false,
                    matched_line: None,
                    evidence: vec![e.to_string()],
                });
            }
        };
        let patterns = PatternSet::heartbeat()?;

        match self
            .watcher()
            .watch(stream, &patterns, supervision.heartbeat_timeout())
            .await
        {
            Ok(hit) => {
                info!(line = %hit.line, elapsed = ?hit.elapsed, "Heartbeat observed");
                Ok(LivenessResult {
                    achieved: true,
                    matched_line: Some(hit.line),
                    evidence: hit.tail,
                })
            }
            Err(WatchError::TimedOut { timeout, tail }) => {
                warn!(timeout = ?timeout, "No heartbeat observed");
                Ok(LivenessResult {
                    achieved: false,
                    matched_line: None,
                    evidence: tail,
                })
            }
            Err(WatchError::Cancelled { .. }) => Err(SupervisorError::Cancelled),
        }
    }
}
