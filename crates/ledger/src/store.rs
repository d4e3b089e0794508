//! The ledger store.

use parking_lot::Mutex;
use rusqlite::{Connection, Row, params};
use types::{AgentId, InteractionKind, InteractionLog, Price, Transaction};

use crate::error::{LedgerError, Result};
use crate::schema::init_schema;

/// Append-only store for [`Transaction`] and [`InteractionLog`] records.
///
/// The connection sits behind a `Mutex` because callers hold `&Ledger`
/// while the coordinator owns the surrounding state; one writer at a time is
/// exactly the serialization the commit path already guarantees.
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Open (or create) a ledger database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory ledger. Used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Persist a transaction. Returns the assigned row id.
    ///
    /// Synchronous: when this returns `Ok`, the row is committed. A failure
    /// here means the trade must not be reported as executed.
    pub fn record_transaction(&self, tx: &Transaction) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO transactions (buyer_id, seller_id, asset, price, timestamp, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tx.buyer_id.as_str(),
                tx.seller_id.as_str(),
                tx.asset,
                tx.price.raw(),
                tx.timestamp as i64,
                tx.run_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Persist an interaction record. Returns the assigned row id.
    pub fn record_interaction(&self, log: &InteractionLog) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO interactions
             (kind, agent_id, counterparty_id, action, asset, price, details, timestamp, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                log.kind.as_str(),
                log.agent_id.as_str(),
                log.counterparty_id.as_ref().map(|id| id.as_str()),
                log.action.as_str(),
                log.asset,
                log.price.raw(),
                log.details,
                log.timestamp as i64,
                log.run_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent transactions, newest first.
    ///
    /// `run_id` restricts the result to a single simulation run.
    pub fn recent_transactions(
        &self,
        limit: usize,
        run_id: Option<&str>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock();
        let mut out = Vec::new();

        match run_id {
            Some(run) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, buyer_id, seller_id, asset, price, timestamp, run_id
                     FROM transactions WHERE run_id = ?1
                     ORDER BY timestamp DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![run, limit as i64], decode_transaction)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, buyer_id, seller_id, asset, price, timestamp, run_id
                     FROM transactions
                     ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], decode_transaction)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }

        Ok(out)
    }

    /// Most recent interaction records, newest first.
    pub fn recent_interactions(
        &self,
        limit: usize,
        run_id: Option<&str>,
    ) -> Result<Vec<InteractionLog>> {
        let conn = self.conn.lock();
        let mut decoded = Vec::new();

        match run_id {
            Some(run) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, kind, agent_id, counterparty_id, action, asset, price,
                            details, timestamp, run_id
                     FROM interactions WHERE run_id = ?1
                     ORDER BY timestamp DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![run, limit as i64], decode_interaction_row)?;
                for row in rows {
                    decoded.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, kind, agent_id, counterparty_id, action, asset, price,
                            details, timestamp, run_id
                     FROM interactions
                     ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], decode_interaction_row)?;
                for row in rows {
                    decoded.push(row?);
                }
            }
        }

        decoded.into_iter().map(finish_interaction).collect()
    }

    /// Total persisted transactions. Used by stats and tests.
    pub fn transaction_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))?;
        Ok(count as u64)
    }
}

fn decode_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        buyer_id: AgentId::new(row.get::<_, String>(1)?),
        seller_id: AgentId::new(row.get::<_, String>(2)?),
        asset: row.get(3)?,
        price: Price(row.get(4)?),
        timestamp: row.get::<_, i64>(5)? as u64,
        run_id: row.get(6)?,
    })
}

/// Raw interaction row: enum columns still as text.
type RawInteraction = (
    i64,
    String,
    String,
    Option<String>,
    String,
    String,
    i64,
    String,
    i64,
    Option<String>,
);

fn decode_interaction_row(row: &Row<'_>) -> rusqlite::Result<RawInteraction> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn finish_interaction(raw: RawInteraction) -> Result<InteractionLog> {
    let (id, kind, agent_id, counterparty_id, action, asset, price, details, timestamp, run_id) =
        raw;

    let kind: InteractionKind = kind
        .parse()
        .map_err(|e| LedgerError::Decode(format!("row {}: {}", id, e)))?;
    let action = action
        .parse()
        .map_err(|e| LedgerError::Decode(format!("row {}: {}", id, e)))?;

    Ok(InteractionLog {
        id: Some(id),
        kind,
        agent_id: AgentId::new(agent_id),
        counterparty_id: counterparty_id.map(AgentId::new),
        action,
        asset,
        price: Price(price),
        details,
        timestamp: timestamp as u64,
        run_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::AgentAction;

    fn tx(buyer: &str, seller: &str, price: f64, timestamp: u64, run_id: Option<&str>) -> Transaction {
        Transaction {
            id: None,
            buyer_id: AgentId::from(buyer),
            seller_id: AgentId::from(seller),
            asset: "AAPL".to_string(),
            price: Price::from_float(price),
            timestamp,
            run_id: run_id.map(String::from),
        }
    }

    fn interaction(agent: &str, kind: InteractionKind, timestamp: u64, run_id: Option<&str>) -> InteractionLog {
        InteractionLog {
            id: None,
            kind,
            agent_id: AgentId::from(agent),
            counterparty_id: None,
            action: AgentAction::Buy,
            asset: "AAPL".to_string(),
            price: Price::from_float(10.0),
            details: "test".to_string(),
            run_id: run_id.map(String::from),
            timestamp,
        }
    }

    #[test]
    fn test_record_and_read_transaction() {
        let ledger = Ledger::open_in_memory().unwrap();

        let id = ledger
            .record_transaction(&tx("buyer", "seller", 10.0, 100, Some("run_1")))
            .unwrap();
        assert!(id > 0);

        let stored = ledger.recent_transactions(10, None).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, Some(id));
        assert_eq!(stored[0].buyer_id, AgentId::from("buyer"));
        assert_eq!(stored[0].seller_id, AgentId::from("seller"));
        assert_eq!(stored[0].price, Price::from_float(10.0));
        assert_eq!(stored[0].run_id.as_deref(), Some("run_1"));
    }

    #[test]
    fn test_transactions_newest_first() {
        let ledger = Ledger::open_in_memory().unwrap();

        ledger.record_transaction(&tx("a", "b", 1.0, 100, None)).unwrap();
        ledger.record_transaction(&tx("c", "d", 2.0, 300, None)).unwrap();
        ledger.record_transaction(&tx("e", "f", 3.0, 200, None)).unwrap();

        let stored = ledger.recent_transactions(10, None).unwrap();
        let timestamps: Vec<u64> = stored.iter().map(|t| t.timestamp).collect();
        assert_eq!(timestamps, vec![300, 200, 100]);
    }

    #[test]
    fn test_same_timestamp_breaks_ties_by_insertion_order() {
        let ledger = Ledger::open_in_memory().unwrap();

        ledger.record_transaction(&tx("first", "x", 1.0, 100, None)).unwrap();
        ledger.record_transaction(&tx("second", "x", 2.0, 100, None)).unwrap();

        let stored = ledger.recent_transactions(10, None).unwrap();
        assert_eq!(stored[0].buyer_id, AgentId::from("second"));
        assert_eq!(stored[1].buyer_id, AgentId::from("first"));
    }

    #[test]
    fn test_limit_respected() {
        let ledger = Ledger::open_in_memory().unwrap();
        for i in 0..5 {
            ledger.record_transaction(&tx("a", "b", 1.0, i, None)).unwrap();
        }

        assert_eq!(ledger.recent_transactions(3, None).unwrap().len(), 3);
        assert_eq!(ledger.transaction_count().unwrap(), 5);
    }

    #[test]
    fn test_run_id_filter() {
        let ledger = Ledger::open_in_memory().unwrap();

        ledger.record_transaction(&tx("a", "b", 1.0, 1, Some("run_1"))).unwrap();
        ledger.record_transaction(&tx("c", "d", 2.0, 2, Some("run_2"))).unwrap();
        ledger.record_transaction(&tx("e", "f", 3.0, 3, None)).unwrap();

        let run_1 = ledger.recent_transactions(10, Some("run_1")).unwrap();
        assert_eq!(run_1.len(), 1);
        assert_eq!(run_1[0].buyer_id, AgentId::from("a"));

        let all = ledger.recent_transactions(10, None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_record_and_read_interactions() {
        let ledger = Ledger::open_in_memory().unwrap();

        ledger
            .record_interaction(&interaction("agent_1", InteractionKind::Negotiation, 10, Some("r")))
            .unwrap();
        ledger
            .record_interaction(&interaction("agent_2", InteractionKind::Action, 20, Some("r")))
            .unwrap();

        let stored = ledger.recent_interactions(10, Some("r")).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].agent_id, AgentId::from("agent_2"));
        assert_eq!(stored[0].kind, InteractionKind::Action);
        assert_eq!(stored[1].kind, InteractionKind::Negotiation);
        assert!(stored.iter().all(|l| l.counterparty_id.is_none()));
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let ledger = Ledger::open(&path).unwrap();
            ledger.record_transaction(&tx("a", "b", 5.0, 1, None)).unwrap();
        }

        let reopened = Ledger::open(&path).unwrap();
        assert_eq!(reopened.transaction_count().unwrap(), 1);
    }
}
