use thiserror::Error;

use crate::chain::{RpcError, UnitsError};

#[derive(Error, Debug)]
pub enum FundingError {
    #[error("Invalid sender key")]
    InvalidSenderKey,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] UnitsError),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("RPC error during {stage}: {source}")]
    Rpc {
        stage: &'static str,
        #[source]
        source: RpcError,
    },
}

impl FundingError {
    pub(crate) fn rpc(stage: &'static str) -> impl FnOnce(RpcError) -> Self {
        move |source| FundingError::Rpc { stage, source }
    }
}
