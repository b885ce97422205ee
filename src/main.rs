//! Guardian Keeper
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌───────────┐
//! │  Launch  │───▶│  Burner  │───▶│ Funding  │───▶│ Heartbeat │
//! │ (docker) │    │ (logs)   │    │  (RPC)   │    │  (logs)   │
//! └──────────┘    └──────────┘    └──────────┘    └───────────┘
//!                       │                               │
//!                       └────────── Telegram ◀──────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use guardian_keeper::chain::JsonRpcClient;
use guardian_keeper::notify::{LogNotifier, NotificationSink, TelegramConfig, TelegramNotifier};
use guardian_keeper::runtime::DockerCli;
use guardian_keeper::supervisor::IdentityRecord;
use guardian_keeper::{NodeConfig, NodeSupervisor, WorkerConfig};

#[derive(Parser)]
#[command(name = "guardian_keeper", version = env!("GIT_HASH"))]
#[command(about = "Launch, fund and watch a guardian node")]
struct Cli {
    /// Node config
    #[arg(long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Telegram config; notifications only go to the log when absent
    #[arg(long, default_value = "config/telegram.yaml")]
    telegram: PathBuf,

    #[arg(long, default_value = "worker1")]
    worker: String,

    /// State directory (default: ~/.mawari_automation)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one supervision cycle (default)
    Run,
    /// Print the persisted burner record
    Identity,
}

fn worker_config(cli: &Cli) -> Result<WorkerConfig> {
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => WorkerConfig::default_base_dir()
            .ok_or_else(|| anyhow!("No home directory; pass --base-dir"))?,
    };
    Ok(WorkerConfig::new(base_dir, &cli.worker))
}

fn notifier(path: &Path) -> Result<Arc<dyn NotificationSink>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Telegram config not found, notifying via log only");
        return Ok(Arc::new(LogNotifier));
    }
    let config = TelegramConfig::from_file(path)?;
    Ok(Arc::new(TelegramNotifier::new(config)))
}

fn show_identity(worker: &WorkerConfig) -> Result<ExitCode> {
    match IdentityRecord::load(&worker.record_path)? {
        Some(record) => {
            println!("worker: {}", worker.name);
            println!("burner: {}", record.burner);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!(
                "No burner recorded for {} ({})",
                worker.name,
                worker.record_path.display()
            );
            Ok(ExitCode::from(1))
        }
    }
}

async fn run(cli: &Cli, config: NodeConfig, worker: WorkerConfig) -> Result<ExitCode> {
    let rpc = JsonRpcClient::new(&config.rpc_url, config.supervision.rpc_timeout())
        .context("Failed to build RPC client")?;
    let notifier = notifier(&cli.telegram)?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown signal received, cancelling run");
            signal_token.cancel();
        }
    });

    let mut supervisor = NodeSupervisor::new(
        config,
        worker,
        Arc::new(DockerCli::new()),
        Arc::new(rpc),
        notifier,
    )?
    .with_cancellation(cancel);

    match supervisor.run().await {
        Ok(report) => {
            tracing::info!(
                burner = %report.identity.burner,
                funding = ?report.funding,
                liveness = report.liveness.achieved,
                states = ?report.states,
                "Run finished"
            );
            Ok(exit_code(report.exit_code()))
        }
        Err(e) => Ok(exit_code(e.exit_code())),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match NodeConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };
    let _log_guard = guardian_keeper::logging::init_logging(&config.logging);
    tracing::info!(version = env!("GIT_HASH"), worker = %cli.worker, "Starting Guardian Keeper");

    let result = match worker_config(&cli) {
        Ok(worker) => match cli.command.as_ref().unwrap_or(&Command::Run) {
            Command::Run => run(&cli, config, worker).await,
            Command::Identity => show_identity(&worker),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Keeper failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
