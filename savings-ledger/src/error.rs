//! Error types for the savings ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Customer owning an account does not exist
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Transaction receipt does not exist
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Amount is not acceptable for the account
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// DS deposit covers too many days at once
    #[error("Please pay for max of {max} days at a time, requested {days}")]
    ExceedsDayLimit {
        /// Days covered by the request
        days: u64,
        /// Configured maximum
        max: u64,
    },

    /// Withdrawal larger than the account balance
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Current balance
        balance: Decimal,
        /// Requested withdrawal
        requested: Decimal,
    },

    /// Transaction was archived before
    #[error("Transaction already archived: {0}")]
    AlreadyArchived(String),

    /// Request is missing required fields
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored document does not have the expected shape
    #[error("Malformed document {path}: {reason}")]
    MalformedDocument {
        /// Document path
        path: String,
        /// What was wrong
        reason: String,
    },

    /// Create-if-absent hit an existing document
    #[error("Document already exists: {0}")]
    DocumentExists(String),

    /// Update or increment against a missing document
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// No free identifier found within the attempt budget
    #[error("No unique id found for prefix {prefix} after {attempts} attempts")]
    IdSpaceExhausted {
        /// Identifier prefix
        prefix: String,
        /// Attempts made
        attempts: u32,
    },

    /// Notification gateway failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for caller mistakes that are rejected before any write happens.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::AccountNotFound(_)
                | Error::CustomerNotFound(_)
                | Error::TransactionNotFound(_)
                | Error::InvalidAmount(_)
                | Error::ExceedsDayLimit { .. }
                | Error::InsufficientFunds { .. }
                | Error::AlreadyArchived(_)
                | Error::InvalidRequest(_)
        )
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::MalformedDocument {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
