//! Balance Monitor
//!
//! Polls an account's native balance until it reaches a threshold or the
//! attempt budget runs out. The poll loop is the only retry mechanism: an
//! RPC error ends the poll and is returned to the caller.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chain::{ChainRpc, RpcError};

/// A single balance reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceObservation {
    pub address: Address,
    pub balance: Decimal,
    pub observed_at: DateTime<Utc>,
}

pub struct BalanceMonitor {
    rpc: Arc<dyn ChainRpc>,
    cancel: CancellationToken,
}

impl BalanceMonitor {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting between attempts once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Take one balance reading
    pub async fn observe(&self, address: Address) -> Result<BalanceObservation, RpcError> {
        let balance = self.rpc.get_balance(address).await?;
        Ok(BalanceObservation {
            address,
            balance,
            observed_at: Utc::now(),
        })
    }

    /// Poll until `address` holds at least `minimum`.
    ///
    /// Returns `Ok(true)` on the first sufficient reading without querying
    /// again, and `Ok(false)` after exactly `max_attempts` insufficient
    /// readings. No sleep follows the last attempt.
    pub async fn poll_until(
        &self,
        address: Address,
        minimum: Decimal,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<bool, RpcError> {
        for attempt in 1..=max_attempts {
            let observation = self.observe(address).await?;

            info!(
                address = %observation.address,
                balance = %observation.balance,
                minimum = %minimum,
                attempt,
                max_attempts,
                "[BAL] balance observed"
            );

            if observation.balance >= minimum {
                return Ok(true);
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = self.cancel.cancelled() => {
                        warn!(%address, attempt, "Balance poll cancelled");
                        return Ok(false);
                    }
                }
            }
        }

        Ok(false)
    }
}
