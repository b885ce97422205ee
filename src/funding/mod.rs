//! Burner funding: balance polling and the operator-to-burner transfer

pub mod balance;
pub mod error;
pub mod transfer;

pub use balance::{BalanceMonitor, BalanceObservation};
pub use error::FundingError;
pub use transfer::{FundingTransfer, SubmittedTransfer, TRANSFER_GAS_LIMIT};
