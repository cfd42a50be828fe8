//! Error types for the onboarding pipeline
//!
//! Errors are split by concern. Configuration and funding errors abort a
//! run; unlock errors are recovered locally by leaving the user locked.

use std::path::PathBuf;
use thiserror::Error;

/// Bad or missing configuration, including the credential file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File does not exist
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Credential row without exactly two columns
    #[error("Malformed credential row at line {line}: expected 2 columns, found {columns}")]
    MalformedRow { line: usize, columns: usize },

    /// Credential row whose first column is not an address
    #[error("Invalid address at line {line}: {value}")]
    InvalidAddress { line: usize, value: String },

    /// Config file is not valid JSON for the expected shape
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Values are individually valid but inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures talking to the protocol client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection or HTTP level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Address is not managed by the node
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Gave up waiting
    #[error("Timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Why an account could not be unlocked
#[derive(Error, Debug)]
pub enum UnlockError {
    #[error("No credential for {0}")]
    NoCredential(String),

    #[error("Unlock rejected for {0}")]
    Rejected(String),

    #[error("Unlock of {address} failed: {source}")]
    Client {
        address: String,
        #[source]
        source: ClientError,
    },
}

/// Funding request or confirmation failure
#[derive(Error, Debug)]
pub enum FundingError {
    /// Submitting the funding request failed
    #[error("Funding request for {address} failed: {source}")]
    Request {
        address: String,
        #[source]
        source: ClientError,
    },

    /// Polling for the receipt failed
    #[error("Confirmation of {tx} failed: {source}")]
    Confirmation {
        tx: String,
        #[source]
        source: ClientError,
    },

    /// No receipt within the confirmation timeout
    #[error("Transaction {tx} not confirmed within {timeout_ms}ms")]
    ConfirmationTimeout { tx: String, timeout_ms: u64 },

    /// Mined, but the transaction failed
    #[error("Transaction {tx} was reverted")]
    Reverted { tx: String },

    /// Reading a balance around the funding step failed
    #[error("Balance query for {address} failed: {source}")]
    Balance {
        address: String,
        #[source]
        source: ClientError,
    },
}

/// Top-level error for an onboarding run
#[derive(Error, Debug)]
pub enum OnboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Unlock(#[from] UnlockError),

    #[error(transparent)]
    Funding(#[from] FundingError),
}

impl OnboardError {
    /// Whether this error must abort the run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, OnboardError::Unlock(_))
    }

    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            OnboardError::Config(e) => match e {
                ConfigError::NotFound(_) => "CONFIG_NOT_FOUND",
                ConfigError::Io { .. } => "CONFIG_IO",
                ConfigError::MalformedRow { .. } => "MALFORMED_CREDENTIAL_ROW",
                ConfigError::InvalidAddress { .. } => "INVALID_CREDENTIAL_ADDRESS",
                ConfigError::Parse(_) => "CONFIG_PARSE",
                ConfigError::Invalid(_) => "INVALID_CONFIG",
            },
            OnboardError::Client(e) => match e {
                ClientError::Transport(_) => "TRANSPORT_ERROR",
                ClientError::Rpc { .. } => "RPC_ERROR",
                ClientError::InvalidResponse(_) => "INVALID_RESPONSE",
                ClientError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
                ClientError::Timeout { .. } => "TIMEOUT",
            },
            OnboardError::Unlock(_) => "UNLOCK_FAILED",
            OnboardError::Funding(e) => match e {
                FundingError::Request { .. } => "FUNDING_REQUEST_FAILED",
                FundingError::Confirmation { .. } => "CONFIRMATION_FAILED",
                FundingError::ConfirmationTimeout { .. } => "CONFIRMATION_TIMEOUT",
                FundingError::Reverted { .. } => "TRANSACTION_REVERTED",
                FundingError::Balance { .. } => "BALANCE_QUERY_FAILED",
            },
        }
    }
}

/// Result type alias for onboarding operations
pub type Result<T> = std::result::Result<T, OnboardError>;

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
