use std::time::Duration;

use thiserror::Error;

/// Failure reported by (or while talking to) an EIP-1193 provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// JSON-RPC error object returned by the wallet.
    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transaction {0} reverted")]
    Reverted(String),
}

impl ProviderError {
    /// JSON-RPC error code, if the wallet returned one.
    pub fn code(&self) -> Option<i64> {
        match self {
            ProviderError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("no wallet detected: install a wallet such as MetaMask or set TIPJAR_WALLET_URL")]
    NoProvider,

    #[error("the wallet returned no accounts")]
    NoAccounts,

    #[error("could not switch network: {0}")]
    NetworkSwitch(String),

    #[error("wrong network: chain id {expected} ({name}) required, wallet is on {actual}")]
    WrongNetwork {
        expected: u64,
        actual: u64,
        name: String,
    },

    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    #[error("transaction failed: {0}")]
    Transaction(#[source] ProviderError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{0} cancelled")]
    Cancelled(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl GatewayError {
    pub(crate) fn invalid_amount(input: &str, reason: impl Into<String>) -> Self {
        GatewayError::InvalidAmount {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
