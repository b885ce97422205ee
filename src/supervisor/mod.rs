//! Supervisor Module
//!
//! One guardian worker's lifecycle: launch, burner capture, funding and
//! liveness confirmation.

pub mod error;
pub mod identity;
pub mod node;
pub mod state;
pub mod worker;

pub use error::SupervisorError;
pub use identity::{IdentityError, IdentityRecord, WorkerIdentity, read_burner_key};
pub use node::{FundingOutcome, LivenessResult, NodeSupervisor, RunReport};
pub use state::RunState;
pub use worker::WorkerConfig;
