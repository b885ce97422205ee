use std::time::Duration;
use thiserror::Error;

use crate::chain::RpcError;
use crate::runtime::RuntimeError;

/// Fatal outcomes of a supervision run
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to launch node: {0}")]
    Launch(#[source] RuntimeError),

    #[error("Burner address not announced within {0:?}")]
    IdentityTimeout(Duration),

    #[error("Could not follow node output: {0}")]
    OutputStream(#[source] RuntimeError),

    #[error("Balance query failed: {0}")]
    BalanceQuery(#[from] RpcError),

    #[error("Worker directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Supervision cancelled")]
    Cancelled,
}

impl SupervisorError {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::Launch(_) => 2,
            SupervisorError::IdentityTimeout(_) => 3,
            SupervisorError::BalanceQuery(_) => 4,
            SupervisorError::Cancelled => 130,
            SupervisorError::OutputStream(_)
            | SupervisorError::Io(_)
            | SupervisorError::Pattern(_) => 1,
        }
    }
}
