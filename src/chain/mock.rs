//! In-memory chain for tests and dry runs

use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::error::RpcError;
use super::rpc::ChainRpc;

/// Scripted [`ChainRpc`].
///
/// Balance queries pop from a script; once one value is left it repeats
/// forever. Submissions are recorded and answered with a fake hash.
#[derive(Debug)]
pub struct MockChainRpc {
    balances: Mutex<VecDeque<Decimal>>,
    gas_price: u128,
    nonce: u64,
    fail_balance: AtomicBool,
    fail_submit: AtomicBool,
    balance_queries: AtomicUsize,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockChainRpc {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(VecDeque::from([Decimal::ZERO])),
            gas_price: 1_000_000_000,
            nonce: 0,
            fail_balance: AtomicBool::new(false),
            fail_submit: AtomicBool::new(false),
            balance_queries: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Balances returned by successive queries
    pub fn with_balances(self, script: impl IntoIterator<Item = Decimal>) -> Self {
        let script: VecDeque<Decimal> = script.into_iter().collect();
        if let Ok(mut balances) = self.balances.lock() {
            *balances = if script.is_empty() {
                VecDeque::from([Decimal::ZERO])
            } else {
                script
            };
        }
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn fail_balance_queries(&self) {
        self.fail_balance.store(true, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    pub fn balance_queries(&self) -> usize {
        self.balance_queries.load(Ordering::SeqCst)
    }

    /// Raw transactions accepted so far
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockChainRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    async fn get_balance(&self, _address: Address) -> Result<Decimal, RpcError> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(RpcError::Connection("mock balance failure".to_string()));
        }

        let mut balances = self
            .balances
            .lock()
            .map_err(|_| RpcError::Connection("mock state poisoned".to_string()))?;
        let balance = if balances.len() > 1 {
            balances.pop_front()
        } else {
            balances.front().copied()
        };
        Ok(balance.unwrap_or(Decimal::ZERO))
    }

    async fn get_gas_price(&self) -> Result<u128, RpcError> {
        Ok(self.gas_price)
    }

    async fn get_nonce(&self, _address: Address) -> Result<u64, RpcError> {
        Ok(self.nonce)
    }

    async fn submit_signed_transaction(&self, raw: &[u8]) -> Result<String, RpcError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(RpcError::Node {
                code: -32000,
                message: "insufficient funds for gas * price + value".to_string(),
            });
        }

        let mut submitted = self
            .submitted
            .lock()
            .map_err(|_| RpcError::Connection("mock state poisoned".to_string()))?;
        submitted.push(raw.to_vec());
        Ok(format!("0x{:064x}", submitted.len()))
    }
}
