//! Error types for ledger operations.

use std::fmt;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while persisting or querying records.
#[derive(Debug)]
pub enum LedgerError {
    /// The underlying SQLite operation failed.
    Database(rusqlite::Error),
    /// A stored row could not be decoded into a domain type.
    Decode(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Database(e) => write!(f, "ledger database error: {}", e),
            LedgerError::Decode(msg) => write!(f, "ledger row decode error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Database(e) => Some(e),
            LedgerError::Decode(_) => None,
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Database(e)
    }
}
