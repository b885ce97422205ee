//! Guardian Keeper - guardian node supervisor
//!
//! Launches a guardian node container, captures the burner wallet it
//! announces, keeps that burner funded from the owner wallet and confirms
//! the node is heartbeating.
//!
//! # Modules
//!
//! - [`config`] - `config.yaml` loading and defaults
//! - [`logging`] - tracing subscriber setup
//! - [`secret`] - redacted private key wrapper
//! - [`chain`] - EVM JSON-RPC, keys and unit conversion
//! - [`funding`] - balance polling and the funding transfer
//! - [`runtime`] - container lifecycle (docker CLI or in-memory)
//! - [`watcher`] - deadline-bounded log scanning
//! - [`notify`] - operator notifications (Telegram or log)
//! - [`supervisor`] - the per-worker run state machine

pub mod chain;
pub mod config;
pub mod funding;
pub mod logging;
pub mod notify;
pub mod runtime;
pub mod secret;
pub mod supervisor;
pub mod watcher;

// Convenient re-exports at crate root
pub use config::{ConfigError, NodeConfig};
pub use secret::Secret;
pub use supervisor::{NodeSupervisor, RunReport, RunState, SupervisorError, WorkerConfig};
