//! Error types for market operations.

use std::fmt;

use ledger::LedgerError;

/// Result type for market operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors that can occur while coordinating a trade.
///
/// Malformed input is not an error: it resolves to "no transaction". The
/// only fault a caller must handle is a failed ledger write, which means the
/// trade did not happen.
#[derive(Debug)]
pub enum MarketError {
    /// The ledger write for a settled trade failed.
    Ledger(LedgerError),
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketError::Ledger(e) => write!(f, "transaction could not be persisted: {}", e),
        }
    }
}

impl std::error::Error for MarketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MarketError::Ledger(e) => Some(e),
        }
    }
}

impl From<LedgerError> for MarketError {
    fn from(e: LedgerError) -> Self {
        MarketError::Ledger(e)
    }
}
