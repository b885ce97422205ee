//! Funding Transfer
//!
//! Builds, signs and submits a plain native-currency transfer from the
//! operator wallet to the burner. Submission is fire-and-forget: balance
//! polling is what confirms the transfer landed.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use super::error::FundingError;
use crate::chain::{ChainRpc, NATIVE_DECIMALS, signer_from_secret, to_base_units};
use crate::secret::Secret;

/// Gas limit of a plain value transfer
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// A transfer that was accepted by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub tx_hash: String,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
}

pub struct FundingTransfer {
    rpc: Arc<dyn ChainRpc>,
    gas_limit: u64,
}

impl FundingTransfer {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            gas_limit: TRANSFER_GAS_LIMIT,
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Send `amount` whole coins from the `sender` key to `recipient`.
    ///
    /// Gas price and nonce are queried fresh on every call.
    pub async fn send(
        &self,
        sender: &Secret,
        recipient: Address,
        amount: Decimal,
        chain_id: u64,
    ) -> Result<SubmittedTransfer, FundingError> {
        let signer = signer_from_secret(sender).map_err(|_| FundingError::InvalidSenderKey)?;
        let from = signer.address();
        let value = to_base_units(amount, NATIVE_DECIMALS)?;

        let gas_price = self
            .rpc
            .get_gas_price()
            .await
            .map_err(FundingError::rpc("gas price"))?;
        let nonce = self
            .rpc
            .get_nonce(from)
            .await
            .map_err(FundingError::rpc("nonce"))?;

        let tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(recipient),
            value,
            input: Bytes::new(),
        };
        let raw = sign_transaction(&signer, tx)?;

        let tx_hash = self
            .rpc
            .submit_signed_transaction(&raw)
            .await
            .map_err(FundingError::rpc("submit"))?;

        info!(
            from = %from,
            to = %recipient,
            amount = %amount,
            nonce,
            gas_price = %gas_price,
            tx_hash = %tx_hash,
            "Funding transfer submitted"
        );

        Ok(SubmittedTransfer {
            tx_hash,
            from,
            to: recipient,
            value,
            nonce,
        })
    }
}

/// Sign a legacy transaction (EIP-155 replay protected) and return its
/// EIP-2718 wire encoding
fn sign_transaction(signer: &PrivateKeySigner, tx: TxLegacy) -> Result<Vec<u8>, FundingError> {
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| FundingError::Signing(e.to_string()))?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));
    Ok(envelope.encoded_2718())
}
