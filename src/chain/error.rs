use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC connection failed: {0}")]
    Connection(String),

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("No result in RPC response for {0}")]
    EmptyResult(&'static str),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Amount must not be negative: {0}")]
    Negative(String),

    #[error("Amount overflows base units: {0}")]
    Overflow(String),
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}
