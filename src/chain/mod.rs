//! Chain access
//!
//! JSON-RPC plumbing, key handling and unit conversion for the guardian
//! network's EVM chain. Everything above this module speaks `Decimal` whole
//! coins and typed `Address`es.

pub mod error;
pub mod keys;
pub mod mock;
pub mod rpc;
pub mod units;

pub use error::{KeyError, RpcError, UnitsError};
pub use keys::{address_of, signer_from_secret};
pub use mock::MockChainRpc;
pub use rpc::{ChainRpc, JsonRpcClient};
pub use units::{NATIVE_DECIMALS, from_base_units, to_base_units};
