//! Durable append-only ledger for transactions and interaction records.
//!
//! The only component in the workspace that touches persistent storage.
//! Backed by SQLite; writes are synchronous relative to the coordinator step
//! that produced them, so a trade is never reported as executed before its
//! row is durably committed.

mod error;
mod schema;
mod store;

pub use error::{LedgerError, Result};
pub use store::Ledger;
